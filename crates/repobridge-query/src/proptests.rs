//! Property tests for page arithmetic and example determinism.

use crate::example::{Example, ExampleMatcher, StringMatcher};
use crate::fixtures::{Person, person_model};
use crate::page::PageRequest;
use crate::sort::{Direction, Order, Sort};
use crate::translate::{apply_example, apply_page, select_for};
use proptest::prelude::*;

const SORTABLE: [&str; 5] = ["id", "firstName", "lastName", "age", "email"];

fn arb_order() -> impl Strategy<Value = Order> {
    (0..SORTABLE.len(), any::<bool>()).prop_map(|(i, desc)| {
        let direction = if desc { Direction::Desc } else { Direction::Asc };
        Order::new(direction, SORTABLE[i])
    })
}

fn arb_sort() -> impl Strategy<Value = Sort> {
    prop::collection::vec(arb_order(), 0..5).prop_map(Sort::from_iter)
}

fn arb_matcher() -> impl Strategy<Value = StringMatcher> {
    prop_oneof![
        Just(StringMatcher::Default),
        Just(StringMatcher::Exact),
        Just(StringMatcher::Starting),
        Just(StringMatcher::Ending),
        Just(StringMatcher::Containing),
    ]
}

fn arb_probe() -> impl Strategy<Value = Person> {
    (
        prop::option::of("[a-z]{1,8}"),
        prop::option::of("[A-Za-z%_]{1,8}"),
        prop::option::of(0i32..120),
    )
        .prop_map(|(first, last, age)| {
            let mut probe = Person::probe();
            probe.first_name = first;
            probe.last_name = last;
            if let Some(age) = age {
                probe = probe.age(age);
            }
            probe
        })
}

fn build_matcher(any: bool, default: StringMatcher, ignore_case: bool) -> ExampleMatcher {
    let base = if any {
        ExampleMatcher::matching_any()
    } else {
        ExampleMatcher::matching_all()
    };
    base.with_string_matcher(default)
        .with_ignore_case(ignore_case)
        .with_ignore_paths(["email"])
}

proptest! {
    #[test]
    fn page_translation_arithmetic(page in 0u64..10_000, size in 1u64..1_000, sort in arb_sort()) {
        let model = person_model();
        let request = PageRequest::of_sorted(page, size, sort.clone()).unwrap();
        let query = apply_page(select_for(&model), &model, &request).unwrap();

        prop_assert_eq!(query.limit, Some(size));
        prop_assert_eq!(query.offset, Some(page * size));
        prop_assert_eq!(query.order_by.len(), sort.len());
        for (expr, order) in query.order_by.iter().zip(sort.iter()) {
            let column = model.property(order.property()).unwrap().storage_name().unwrap();
            prop_assert_eq!(expr.column.as_str(), column);
            prop_assert_eq!(expr.direction, order.direction());
        }
    }

    #[test]
    fn example_translation_deterministic(
        probe in arb_probe(),
        any in any::<bool>(),
        default in arb_matcher(),
        ignore_case in any::<bool>(),
    ) {
        let model = person_model();
        let first = Example::with_matcher(probe.clone(), build_matcher(any, default, ignore_case));
        let second = Example::with_matcher(probe, build_matcher(any, default, ignore_case));

        let left = apply_example(select_for(&model), &model, &first).unwrap();
        let right = apply_example(select_for(&model), &model, &second).unwrap();
        prop_assert_eq!(left, right);
    }
}
