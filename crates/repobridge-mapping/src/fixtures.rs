//! Mapped types shared by the unit tests of this crate.

use repobridge_core::{
    Annotation, AssociationKind, EntityDescriptor, Mapped, PropertyInfo, SqlType,
};

pub struct User;
impl Mapped for User {
    const NAME: &'static str = "User";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("name", SqlType::Text),
            PropertyInfo::new("email", SqlType::Text).with(&[Annotation::Indexed(None)]),
            PropertyInfo::new("createdAt", SqlType::Timestamp)
                .nullable(true)
                .with(&[Annotation::Transient]),
        ];
        P
    }
}

pub struct Animal;
impl Mapped for Animal {
    const NAME: &'static str = "Animal";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("name", SqlType::Text),
            PropertyInfo::new("legs", SqlType::Integer),
        ];
        P
    }
}

pub struct Dog;
impl Mapped for Dog {
    const NAME: &'static str = "Dog";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("name", SqlType::Text).with(&[Annotation::Indexed(None)]),
            PropertyInfo::new("breed", SqlType::Text),
        ];
        P
    }
    fn parent() -> Option<fn() -> EntityDescriptor> {
        Some(Animal::descriptor)
    }
}

pub struct Order;
impl Mapped for Order {
    const NAME: &'static str = "Order";
    fn annotations() -> &'static [Annotation] {
        static A: &[Annotation] = &[
            Annotation::Table("orders"),
            Annotation::DisplayName("Purchase Order"),
            Annotation::CompositeIndex {
                name: "idx_customer_placed",
                properties: &["customerId", "placedAt"],
            },
        ];
        A
    }
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("customerId", SqlType::BigInt),
            PropertyInfo::new("placedAt", SqlType::Timestamp),
        ];
        P
    }
}

/// Value object without an identifier.
pub struct Address;
impl Mapped for Address {
    const NAME: &'static str = "Address";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("street", SqlType::Text),
            PropertyInfo::new("city", SqlType::Text),
        ];
        P
    }
}

pub struct Customer;
impl Mapped for Customer {
    const NAME: &'static str = "Customer";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("address", SqlType::Embedded)
                .with(&[Annotation::Embedded])
                .target(Address::descriptor),
            PropertyInfo::new("account", SqlType::Reference)
                .with(&[Annotation::association(AssociationKind::OneToOne)])
                .target(Account::descriptor),
        ];
        P
    }
}

pub struct Account;
impl Mapped for Account {
    const NAME: &'static str = "Account";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("owner", SqlType::Reference)
                .with(&[Annotation::association(AssociationKind::ManyToOne)])
                .target(Customer::descriptor),
            PropertyInfo::new("revision", SqlType::BigInt).with(&[Annotation::Version]),
        ];
        P
    }
}

pub struct TwoVersions;
impl Mapped for TwoVersions {
    const NAME: &'static str = "TwoVersions";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("v1", SqlType::BigInt).with(&[Annotation::Version]),
            PropertyInfo::new("v2", SqlType::BigInt).with(&[Annotation::Version]),
        ];
        P
    }
}

pub struct SharedColumn;
impl Mapped for SharedColumn {
    const NAME: &'static str = "SharedColumn";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("a", SqlType::Text).with(&[Annotation::Column("shared")]),
            PropertyInfo::new("b", SqlType::Text).with(&[Annotation::Column("shared")]),
        ];
        P
    }
}

pub struct TransientVersion;
impl Mapped for TransientVersion {
    const NAME: &'static str = "TransientVersion";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("v", SqlType::BigInt)
                .with(&[Annotation::Version, Annotation::Transient]),
        ];
        P
    }
}

/// Owner whose embedded target cannot be modelled.
pub struct Holder;
impl Mapped for Holder {
    const NAME: &'static str = "Holder";
    fn properties() -> &'static [PropertyInfo] {
        static P: &[PropertyInfo] = &[
            PropertyInfo::new("id", SqlType::BigInt).with(&[Annotation::Id]),
            PropertyInfo::new("broken", SqlType::Embedded)
                .with(&[Annotation::Embedded])
                .target(TwoVersions::descriptor),
        ];
        P
    }
}
