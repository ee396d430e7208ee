use pathtrace_model::choice::{
    ChoiceFromList, ChoiceGenerator, CgKind, IntIntervalGenerator, ThreadInfo,
};
use pathtrace_model::state::SystemState;
use pathtrace_tracker::config::{Format, TrackerConfig};
use pathtrace_tracker::format::{write_choices, ChoiceLines, RenderedLine};

/// Push `cg` after moving it to its `advances`-th choice.
fn push(state: &mut SystemState, mut cg: Box<dyn ChoiceGenerator>, advances: usize) {
    for _ in 0..advances {
        cg.advance();
    }
    state.push(cg);
}

fn mixed_stack() -> SystemState {
    let mut state = SystemState::new();
    push(&mut state, Box::new(IntIntervalGenerator::new("verifyGetInt(II)", 0, 4).with_location("Mix.rs:3")), 2);
    push(&mut state, Box::new(ChoiceFromList::boolean("verifyGetBoolean").with_location("Mix.rs:4")), 2);
    push(
        &mut state,
        Box::new(ChoiceFromList::threads(
            "START",
            vec![ThreadInfo::new(0, "main"), ThreadInfo::new(1, "worker")],
        )),
        2,
    );
    state
}

fn render(config: &TrackerConfig, state: &SystemState) -> String {
    let mut out = Vec::new();
    write_choices(&mut out, config, state.choice_generators()).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_boolean_branch_scenario() {
    let mut state = SystemState::new();
    push(&mut state, Box::new(ChoiceFromList::boolean("verifyGetBoolean").with_location("Flip.rs:7")), 2);

    assert_eq!(
        render(&TrackerConfig::default(), &state),
        "   0: BooleanChoiceGenerator[[id=\"verifyGetBoolean\",isCascaded:false,{false,>true}]\n \tat Flip.rs:7\n"
    );
}

#[test]
fn test_no_live_choices_renders_nothing() {
    let mut state = SystemState::new();
    let mut retired = ChoiceFromList::boolean("retired");
    retired.advance();
    retired.set_done();
    state.push(Box::new(retired));
    // Never advanced: no current choice yet.
    state.push(Box::new(ChoiceFromList::ints("pending", &[1, 2])));

    let mut out = Vec::new();
    let written = write_choices(&mut out, &TrackerConfig::default(), state.choice_generators()).unwrap();
    assert_eq!(written, 0);
    assert!(out.is_empty());
}

#[test]
fn test_empty_allow_list_reports_every_kind() {
    let mut state = mixed_stack();
    push(&mut state, Box::new(ChoiceFromList::doubles("d", &[0.5])), 1);
    push(&mut state, Box::new(ChoiceFromList::floats("f", &[0.25])), 1);
    push(&mut state, Box::new(ChoiceFromList::longs("l", &[7])), 1);
    push(&mut state, Box::new(ChoiceFromList::ints("s", &[9])), 1);

    let text = render(&TrackerConfig::default(), &state);
    for name in [
        "IntIntervalGenerator",
        "BooleanChoiceGenerator",
        "ThreadChoiceFromSet",
        "DoubleChoiceFromList",
        "FloatChoiceFromList",
        "LongChoiceFromList",
        "IntChoiceFromSet",
    ] {
        assert!(text.contains(name), "{name} missing from:\n{text}");
    }
    assert!(!text.contains("pathtrace::"), "namespaces should be stripped:\n{text}");
}

#[test]
fn test_allow_list_keeps_only_matching_kind() {
    let state = mixed_stack();
    let config = TrackerConfig {
        allowed: vec![CgKind::BooleanChoiceGenerator],
        ..TrackerConfig::default()
    };

    let lines: Vec<RenderedLine> = ChoiceLines::new(&config, state.choice_generators()).collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].index, 0);
    assert!(lines[0].body.starts_with("BooleanChoiceGenerator"));
    assert_eq!(lines[0].location.as_deref(), Some("Mix.rs:4"));
}

#[test]
fn test_allow_list_matches_abstract_kinds() {
    let state = mixed_stack();
    let config = TrackerConfig {
        allowed: vec![CgKind::IntChoiceGenerator, CgKind::ThreadChoiceGenerator],
        ..TrackerConfig::default()
    };

    let bodies: Vec<String> = ChoiceLines::new(&config, state.choice_generators())
        .map(|line| line.body)
        .collect();
    assert_eq!(bodies.len(), 2);
    assert!(bodies[0].starts_with("IntIntervalGenerator"));
    assert!(bodies[1].starts_with("ThreadChoiceFromSet"));
}

#[test]
fn test_formats_differ_only_in_body() {
    let state = mixed_stack();
    let cg_config = TrackerConfig::default();
    let choice_config = TrackerConfig {
        format: Format::Choice,
        ..TrackerConfig::default()
    };

    let cg_lines: Vec<RenderedLine> = ChoiceLines::new(&cg_config, state.choice_generators()).collect();
    let choice_lines: Vec<RenderedLine> =
        ChoiceLines::new(&choice_config, state.choice_generators()).collect();

    assert_eq!(cg_lines.len(), choice_lines.len());
    for (cg, choice) in cg_lines.iter().zip(&choice_lines) {
        assert_eq!(cg.index, choice.index);
        assert_eq!(cg.location, choice.location);
        assert_ne!(cg.body, choice.body);
    }

    let bodies: Vec<&str> = choice_lines.iter().map(|line| line.body.as_str()).collect();
    assert_eq!(bodies, vec!["1", "true", "ThreadInfo[name=worker,id=1]"]);
}

#[test]
fn test_indices_are_dense_over_emitted_lines() {
    let state = mixed_stack();
    let config = TrackerConfig {
        format: Format::Choice,
        excludes: vec!["true".to_string()],
        show_location: false,
        ..TrackerConfig::default()
    };

    assert_eq!(
        render(&config, &state),
        "   0: 1\n   1: ThreadInfo[name=worker,id=1]\n"
    );
}

// Each surviving choice is printed once, however many prefixes it misses.
#[test]
fn test_non_matching_exclusions_emit_each_choice_once() {
    let state = mixed_stack();
    let config = TrackerConfig {
        excludes: vec!["foo".to_string(), "bar".to_string(), "baz".to_string()],
        show_location: false,
        ..TrackerConfig::default()
    };

    let lines: Vec<RenderedLine> = ChoiceLines::new(&config, state.choice_generators()).collect();
    let indices: Vec<usize> = lines.iter().map(|line| line.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_exclusion_matches_qualified_value_text() {
    let state = mixed_stack();
    let config = TrackerConfig {
        excludes: vec!["pathtrace::vm::ThreadInfo".to_string()],
        ..TrackerConfig::default()
    };
    let lines: Vec<RenderedLine> = ChoiceLines::new(&config, state.choice_generators()).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| !line.body.starts_with("ThreadChoiceFromSet")));
}

#[test]
fn test_location_lines_follow_flag() {
    let mut state = SystemState::new();
    push(&mut state, Box::new(ChoiceFromList::boolean("b").with_location("Flag.rs:1")), 1);
    push(&mut state, Box::new(ChoiceFromList::boolean("c").with_location("")), 1);

    let shown = render(&TrackerConfig::default(), &state);
    assert_eq!(shown.matches(" \tat ").count(), 1);
    assert!(shown.contains("\n \tat Flag.rs:1\n   1: "));

    let hidden = render(
        &TrackerConfig {
            show_location: false,
            ..TrackerConfig::default()
        },
        &state,
    );
    assert!(!hidden.contains("\tat"));
}
