mod common;

use budget_tree::{
    budget::{DurationUnit, LineProperty},
    Budget, BudgetError, Config, CurrencyCode, LineOptions, Overhead,
};
use chrono::{TimeZone, Utc};
use common::{append, budget, budget_with, priced, rates};

#[test]
fn two_usd_leaves_roll_up_to_root() {
    let mut budget = budget();
    let root = budget.root();
    let a = append(&mut budget, root, priced(2.0, 50.0).currency("USD"));
    let b = append(&mut budget, root, priced(1.0, 100.0).currency("USD"));

    assert_eq!(budget.line(a).expect("a").cost(), 100.0);
    assert_eq!(budget.line(b).expect("b").total(), 100.0);
    assert_eq!(budget.root_line().total(), 200.0);
    assert_eq!(budget.root_line().total_checked(), Some(200.0));
}

#[test]
fn frequency_multiplies_cost_into_total() {
    let mut budget = budget();
    let root = budget.root();
    let leaf = append(&mut budget, root, priced(3.0, 10.0).frequency(4));

    let line = budget.line(leaf).expect("leaf");
    assert_eq!(line.cost(), 30.0);
    assert_eq!(line.total(), 120.0);
    assert_eq!(line.total_without_overhead(), 120.0);
}

#[test]
fn lumpsum_unit_type_pins_unit_number() {
    let mut budget = budget();
    let root = budget.root();
    let leaf = append(
        &mut budget,
        root,
        LineOptions::new().unit_type("LS").unit_number(7.0).unit_cost(40.0),
    );
    assert_eq!(budget.line(leaf).expect("leaf").unit_number(), 1.0);
    assert_eq!(budget.line(leaf).expect("leaf").total(), 40.0);
}

#[test]
fn lines_with_children_read_zero_leaf_fields() {
    let mut budget = budget();
    let root = budget.root();
    append(&mut budget, root, priced(2.0, 5.0));

    let root_line = budget.root_line();
    assert!(!root_line.is_leaf());
    assert_eq!(root_line.unit_number(), 0.0);
    assert_eq!(root_line.unit_cost(), 0.0);
    assert_eq!(root_line.unit_type(), "");
    assert_eq!(root_line.frequency(), 0);
    assert_eq!(root_line.cost(), 0.0);
    assert!(root_line.unit_currency().is_none());
    assert_eq!(root_line.total(), 10.0);
}

#[test]
fn child_totals_are_converted_into_parent_currency() {
    let rates = rates();
    rates.insert_rates(&CurrencyCode::new("EUR"), [("USD", 1.1)]);
    let mut budget = budget_with(rates);
    let root = budget.root();
    let eur = append(&mut budget, root, priced(1.0, 100.0).currency("EUR"));
    append(&mut budget, root, priced(1.0, 40.0));

    assert_eq!(budget.line(eur).expect("eur").total(), 100.0);
    assert_eq!(budget.root_line().total(), 150.0);
}

#[test]
fn unit_currency_converts_into_line_currency() {
    let rates = rates();
    rates.insert_rates(&CurrencyCode::new("EUR"), [("USD", 2.0)]);
    let mut budget = budget_with(rates);
    let root = budget.root();
    let leaf = append(
        &mut budget,
        root,
        priced(3.0, 10.0).currency("USD").unit_currency("eur"),
    );

    let line = budget.line(leaf).expect("leaf");
    assert_eq!(line.cost(), 30.0);
    assert_eq!(line.total(), 60.0);
    assert_eq!(line.unit_currency(), Some(&CurrencyCode::new("EUR")));
}

#[test]
fn child_in_other_currency_keeps_inherited_price_currency() {
    let rates = rates();
    rates.insert_rates(&CurrencyCode::new("USD"), [("EUR", 0.5)]);
    rates.insert_rates(&CurrencyCode::new("EUR"), [("USD", 2.0)]);
    let mut budget = budget_with(rates);
    let root = budget.root();
    let leaf = append(&mut budget, root, priced(1.0, 100.0));
    assert_eq!(budget.root_line().total(), 100.0);

    let child = append(&mut budget, leaf, LineOptions::new().currency("EUR"));
    let line = budget.line(child).expect("child");
    assert_eq!(line.unit_cost(), 100.0);
    assert_eq!(line.unit_currency(), Some(&CurrencyCode::new("USD")));
    assert_eq!(line.total(), 50.0);
    assert_eq!(budget.root_line().total(), 100.0);
}

#[test]
fn formatted_total_uses_display_decimals() {
    let mut config = Config::default();
    config.show_decimals = 1;
    let mut budget = Budget::new(LineOptions::new().currency("USD"), config, rates());
    let root = budget.root();
    append(&mut budget, root, priced(3.0, 4.27));
    assert_eq!(budget.root_line().total(), 12.81);
    assert_eq!(budget.root_line().formatted_total(), "12.8");
}

#[test]
fn missing_rate_propagates_nan_until_rates_arrive() {
    let rates = rates();
    let mut budget = budget_with(rates.clone());
    let root = budget.root();
    let group = append(&mut budget, root, LineOptions::new().title("Imports"));
    append(&mut budget, group, priced(1.0, 100.0).currency("GBP"));

    assert!(budget.root_line().total().is_nan());
    assert!(budget.line(group).expect("group").total().is_nan());
    assert_eq!(budget.root_line().total_checked(), None);
    assert!(budget.root_line().rate_unavailable());
    assert_eq!(rates.pending_bases(), vec![CurrencyCode::new("GBP")]);

    let pending = rates.take_pending_bases();
    assert_eq!(pending, vec![CurrencyCode::new("GBP")]);
    rates.insert_rates(&CurrencyCode::new("GBP"), [("USD", 1.25)]);

    assert_eq!(budget.root_line().total(), 125.0);
    assert!(!budget.root_line().rate_unavailable());
    assert!(rates.pending_bases().is_empty());
}

#[test]
fn observed_values_round_half_away_from_zero() {
    let mut budget = budget();
    let root = budget.root();
    let leaf = append(&mut budget, root, priced(1.0, 0.125));
    assert_eq!(budget.line(leaf).expect("leaf").cost(), 0.13);

    let second = append(&mut budget, root, priced(1.0, 0.125));
    assert_eq!(budget.line(second).expect("leaf").total(), 0.13);
    // The sum of raw values is rounded, not the sum of rounded values.
    assert_eq!(budget.root_line().total(), 0.25);
}

#[test]
fn currencies_cover_the_whole_subtree() {
    let mut budget = budget();
    let root = budget.root();
    let child = append(&mut budget, root, priced(1.0, 1.0).currency("EUR"));
    budget
        .update(child, LineOptions::new().unit_currency("GBP"))
        .expect("unit currency");
    budget
        .add_overhead(child, Overhead::new("Fee", 0.1).with_currency("JPY"))
        .expect("overhead");

    let codes: Vec<String> = budget
        .root_line()
        .currencies()
        .into_iter()
        .map(|code| code.0)
        .collect();
    assert_eq!(codes, vec!["EUR", "GBP", "JPY", "USD"]);
}

#[test]
fn date_range_rolls_up_from_leaves() {
    let mut budget = budget();
    let root = budget.root();
    let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let mar = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    append(&mut budget, root, priced(1.0, 1.0).start(feb).end(mar));
    append(&mut budget, root, priced(1.0, 1.0).start(jan).end(feb));

    let root_line = budget.root_line();
    assert_eq!(root_line.start(), jan);
    assert_eq!(root_line.end(), mar);
    assert_eq!(root_line.duration_in(DurationUnit::Days), 60.0);

    let err = budget.set_start(root, jan).expect_err("group start is derived");
    assert!(matches!(err, BudgetError::NotALeaf(_)));
}

#[test]
fn default_end_is_one_day_after_start() {
    let mut budget = budget();
    let root = budget.root();
    let start = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
    let leaf = append(&mut budget, root, priced(1.0, 1.0).start(start));
    let line = budget.line(leaf).expect("leaf");
    assert_eq!(line.duration_in(DurationUnit::Days), 1.0);
    assert_eq!(line.duration_in(DurationUnit::Milliseconds), 86_400_000.0);
}

#[test]
fn modified_reports_latest_change_below() {
    let mut budget = budget();
    let root = budget.root();
    let group = append(&mut budget, root, LineOptions::new());
    let leaf = append(&mut budget, group, priced(1.0, 1.0));
    budget.set_title(leaf, "Concrete").expect("title");

    let leaf_modified = budget.line(leaf).expect("leaf").modified();
    assert_eq!(budget.root_line().modified(), leaf_modified);
    assert_eq!(budget.line(group).expect("group").modified(), leaf_modified);
}

#[test]
fn first_and_last_by_property() {
    let mut budget = budget();
    let root = budget.root();
    let small = append(&mut budget, root, priced(1.0, 10.0));
    let large = append(&mut budget, root, priced(1.0, 30.0));
    let group = append(&mut budget, root, LineOptions::new());
    let deep = append(&mut budget, group, priced(1.0, 50.0));
    let tie = append(&mut budget, root, priced(1.0, 10.0));

    let root_line = budget.root_line();
    let first = root_line.get_first(LineProperty::Total, false).expect("first");
    assert_eq!(first.id(), small);
    assert_ne!(first.id(), tie);
    assert_eq!(
        root_line.get_last(LineProperty::Total, false).expect("last").id(),
        group
    );
    assert_eq!(
        root_line.get_last(LineProperty::UnitCost, true).expect("deep").id(),
        deep
    );
    assert_eq!(
        root_line.get_last(LineProperty::UnitCost, false).expect("shallow").id(),
        large
    );

    let leaf = budget.line(deep).expect("deep");
    assert!(leaf.get_first(LineProperty::Total, true).is_none());
}
