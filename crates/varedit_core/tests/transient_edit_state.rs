use serde_json::json;
use varedit_core::{TransientEditState, VariableDefinition, VariableDefinitionList, VariablePlugin};

fn named(names: &[&str]) -> VariableDefinitionList {
    names
        .iter()
        .map(|name| VariableDefinition::text(*name, ""))
        .collect()
}

fn is_dirty(working: &VariableDefinitionList, base: &VariableDefinitionList) -> bool {
    let mut state = TransientEditState::seed(base);
    state.update(working.clone());
    state.is_dirty(base)
}

#[test]
fn equal_lists_are_clean() {
    assert!(!is_dirty(&named(&["x"]), &named(&["x"])));
    assert!(!is_dirty(&named(&[]), &named(&[])));
}

#[test]
fn order_is_part_of_the_value() {
    assert!(is_dirty(&named(&["x", "y"]), &named(&["y", "x"])));
}

#[test]
fn added_removed_and_changed_definitions_are_dirty() {
    assert!(is_dirty(&named(&["x", "y"]), &named(&["x"])));
    assert!(is_dirty(&named(&[]), &named(&["x"])));

    let changed = VariableDefinitionList::new(vec![VariableDefinition::text("x", "new")]);
    assert!(is_dirty(&changed, &named(&["x"])));

    let relabelled =
        VariableDefinitionList::new(vec![VariableDefinition::text("x", "").with_display_name("X")]);
    assert!(is_dirty(&relabelled, &named(&["x"])));
}

#[test]
fn plugin_payload_key_order_does_not_make_a_list_dirty() {
    let base = VariableDefinitionList::new(vec![VariableDefinition::list(
        "job",
        VariablePlugin {
            kind: "PrometheusLabelValues".to_string(),
            spec: json!({ "label_name": "job", "matchers": ["up"] }),
        },
    )]);
    let rewritten: VariableDefinitionList = serde_json::from_str(
        r#"[{"kind":"ListVariable","spec":{"plugin":{"spec":{"matchers":["up"],"label_name":"job"},"kind":"PrometheusLabelValues"},"name":"job"}}]"#,
    )
    .unwrap();

    assert!(!is_dirty(&rewritten, &base));
}

#[test]
fn working_copy_is_independent_of_its_seed() {
    let mut items = vec![VariableDefinition::text("a", "")];
    let base = VariableDefinitionList::new(items.clone());
    let mut state = TransientEditState::seed(&base);

    items.push(VariableDefinition::text("b", ""));
    let grown = VariableDefinitionList::new(items);
    assert!(state.is_dirty(&grown));
    assert!(!state.is_dirty(&base));

    state.update(named(&["z"]));
    assert_eq!(base, named(&["a"]));
    drop(base);
    assert_eq!(state.into_inner(), named(&["z"]));
}
