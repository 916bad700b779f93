mod common;

use budget_tree::{budget::OverheadUpdate, BudgetError, CurrencyCode, Overhead};
use common::{append, budget, budget_with, priced, rates};

#[test]
fn overheads_compound_in_sequence() {
    let mut budget = budget();
    let root = budget.root();
    let leaf = append(&mut budget, root, priced(1.0, 100.0));
    assert_eq!(
        budget.add_overhead(leaf, Overhead::new("Contingency", 0.1)).expect("first"),
        1
    );
    assert_eq!(
        budget.add_overhead(leaf, Overhead::new("Management", 0.2)).expect("second"),
        2
    );

    let line = budget.line(leaf).expect("leaf");
    let amounts = line.overhead_amounts();
    assert_eq!(amounts[0].base_total, 100.0);
    assert_eq!(amounts[0].total, 10.0);
    assert_eq!(amounts[1].base_total, 110.0);
    assert_eq!(amounts[1].total, 22.0);
    assert_eq!(line.overhead_total(), 32.0);
    assert_eq!(line.total_without_overhead(), 100.0);
    assert_eq!(line.total(), 132.0);
    assert_eq!(budget.root_line().total(), 132.0);
}

#[test]
fn reordering_recomputes_later_bases() {
    let mut budget = budget();
    let root = budget.root();
    let leaf = append(&mut budget, root, priced(1.0, 100.0));
    budget.add_overhead(leaf, Overhead::new("Contingency", 0.1)).expect("first");
    budget.add_overhead(leaf, Overhead::new("Management", 0.2)).expect("second");

    budget.move_overhead_up(leaf, 2).expect("move up");
    let amounts = budget.line(leaf).expect("leaf").overhead_amounts();
    assert_eq!(amounts[0].title, "Management");
    assert_eq!(amounts[0].total, 20.0);
    assert_eq!(amounts[1].base_total, 120.0);
    assert_eq!(amounts[1].total, 12.0);

    budget.move_overhead_down(leaf, 1).expect("move down");
    let amounts = budget.line(leaf).expect("leaf").overhead_amounts();
    assert_eq!(amounts[0].title, "Contingency");

    assert!(budget.move_overhead_up(leaf, 1).is_err());
    assert!(budget.move_overhead_down(leaf, 2).is_err());
}

#[test]
fn overhead_in_its_own_currency() {
    let rates = rates();
    rates.insert_rates(&CurrencyCode::new("USD"), [("EUR", 0.5)]);
    rates.insert_rates(&CurrencyCode::new("EUR"), [("USD", 2.0)]);
    let mut budget = budget_with(rates);
    let root = budget.root();
    let leaf = append(&mut budget, root, priced(1.0, 100.0));
    budget
        .add_overhead(leaf, Overhead::new("Agency fee", 0.1).with_currency("EUR"))
        .expect("overhead");

    let line = budget.line(leaf).expect("leaf");
    let amounts = line.overhead_amounts();
    assert_eq!(amounts[0].currency, CurrencyCode::new("EUR"));
    assert_eq!(amounts[0].total, 5.0);
    assert_eq!(line.overhead_total(), 10.0);
    assert_eq!(line.total(), 110.0);
}

#[test]
fn overheads_on_a_group_apply_to_the_rolled_up_total() {
    let mut budget = budget();
    let root = budget.root();
    append(&mut budget, root, priced(2.0, 25.0));
    append(&mut budget, root, priced(1.0, 50.0));
    budget.add_overhead(root, Overhead::new("VAT", 0.25)).expect("overhead");

    assert_eq!(budget.root_line().total_without_overhead(), 100.0);
    assert_eq!(budget.root_line().total(), 125.0);
}

#[test]
fn remove_and_update_use_one_based_positions() {
    let mut budget = budget();
    let root = budget.root();
    let leaf = append(&mut budget, root, priced(1.0, 100.0));
    budget.add_overhead(leaf, Overhead::new("A", 0.1)).expect("a");
    budget.add_overhead(leaf, Overhead::new("B", 0.2)).expect("b");

    let err = budget.remove_overhead(leaf, 3).expect_err("out of range");
    assert!(matches!(err, BudgetError::OverheadNotFound { position: 3, .. }));
    assert!(budget.remove_overhead(leaf, 0).is_err());

    let removed = budget.remove_overhead(leaf, 1).expect("remove first");
    assert_eq!(removed.title, "A");
    assert_eq!(budget.line(leaf).expect("leaf").overhead()[0].title, "B");

    budget
        .update_overhead(
            leaf,
            1,
            OverheadUpdate {
                title: Some("Insurance".into()),
                percentage: Some(0.05),
                currency: None,
            },
        )
        .expect("update");
    let line = budget.line(leaf).expect("leaf");
    assert_eq!(line.overhead()[0].title, "Insurance");
    assert_eq!(line.total(), 105.0);
}

#[test]
fn invalid_overheads_are_rejected_without_change() {
    let mut budget = budget();
    let root = budget.root();
    let leaf = append(&mut budget, root, priced(1.0, 100.0));

    let err = budget
        .add_overhead(leaf, Overhead::new("Bad", 0.1).with_currency("XYZ"))
        .expect_err("unknown currency");
    assert!(matches!(err, BudgetError::InvalidCurrency(_)));
    assert!(budget
        .add_overhead(leaf, Overhead::new("Bad", f64::NAN))
        .is_err());
    assert!(budget.line(leaf).expect("leaf").overhead().is_empty());

    budget.add_overhead(leaf, Overhead::new("Ok", 0.1)).expect("valid");
    let update = OverheadUpdate {
        percentage: Some(f64::INFINITY),
        ..Default::default()
    };
    assert!(budget.update_overhead(leaf, 1, update).is_err());
    assert_eq!(budget.line(leaf).expect("leaf").overhead()[0].percentage, 0.1);
}
