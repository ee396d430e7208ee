use std::cell::Cell;

use pathtrace_model::choice::ThreadInfo;
use pathtrace_model::config::Config;
use pathtrace_search::listener::SearchListener;
use pathtrace_search::search::{Execution, Search, SearchConfig, SearchError, SearchView, Violation};

/// Listener that snapshots the path at every violation.
#[derive(Default)]
struct PathRecorder {
    started: bool,
    finished: bool,
    violations: Vec<Vec<String>>,
    locations: Vec<Option<String>>,
}

impl SearchListener for PathRecorder {
    fn search_started(&mut self, _search: &dyn SearchView) {
        self.started = true;
    }

    fn property_violated(&mut self, search: &dyn SearchView) {
        let stack = search.system_state().choice_generators();
        self.violations
            .push(stack.iter().map(|cg| cg.to_string()).collect());
        self.locations = stack
            .iter()
            .map(|cg| cg.source_location().map(str::to_string))
            .collect();
    }

    fn search_finished(&mut self, _search: &dyn SearchView) {
        self.finished = true;
    }
}

#[test]
fn test_explores_every_path() {
    let mut search = Search::new(SearchConfig::default());
    let mut recorder = PathRecorder::default();
    let summary = search
        .run(
            |ctx| {
                ctx.verify_bool();
                ctx.verify_bool();
                Ok(())
            },
            &mut recorder,
        )
        .unwrap();

    assert_eq!(summary.paths_explored, 4);
    assert_eq!(summary.max_depth, 2);
    assert!(!summary.has_violations());
    assert!(recorder.started && recorder.finished);
}

#[test]
fn test_stops_at_first_violation_and_keeps_path() {
    let mut search = Search::new(SearchConfig::default());
    let mut recorder = PathRecorder::default();
    let summary = search
        .run(
            |ctx| {
                if ctx.verify_bool() {
                    return Err(Violation::exception("boom"));
                }
                Ok(())
            },
            &mut recorder,
        )
        .unwrap();

    assert_eq!(summary.paths_explored, 2);
    assert_eq!(summary.violations.len(), 1);
    assert_eq!(summary.violations[0].id, "#1");
    assert_eq!(
        recorder.violations,
        vec![vec![
            "pathtrace::choice::BooleanChoiceGenerator[[id=\"verifyGetBoolean\",isCascaded:false,{false,>true}]"
                .to_string()
        ]]
    );
    assert_eq!(search.depth(), 1, "violating path stays on the stack");
    assert_eq!(search.last_violation().map(|v| v.violation.message.as_str()), Some("boom"));
}

#[test]
fn test_multiple_errors_continues_search() {
    let config = SearchConfig {
        multiple_errors: true,
        ..SearchConfig::default()
    };
    let mut search = Search::new(config);
    let mut recorder = PathRecorder::default();
    let summary = search
        .run(
            |ctx| {
                let x = ctx.verify_int(0, 2);
                Err(Violation::new("AssertionProperty", format!("x = {x}")))
            },
            &mut recorder,
        )
        .unwrap();

    let ids: Vec<&str> = summary.violations.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["#1", "#2", "#3"]);
    assert_eq!(summary.violations[2].violation.message, "x = 2");
    assert_eq!(recorder.violations.len(), 3);
}

#[test]
fn test_ignore_remaining_choices_prunes_generator() {
    let mut search = Search::new(SearchConfig::default());
    let summary = search
        .run(
            |ctx| {
                ctx.verify_int(0, 9);
                ctx.ignore_remaining_choices();
                Ok(())
            },
            &mut PathRecorder::default(),
        )
        .unwrap();
    assert_eq!(summary.paths_explored, 1);
}

#[test]
fn test_random_values_branch_only_when_enumerated() {
    let program = |ctx: &mut Execution<'_>| -> Result<(), Violation> {
        ctx.random_int(3);
        ctx.random_bool();
        Ok(())
    };

    let mut drawn = Search::new(SearchConfig::default());
    let summary = drawn.run(program, &mut PathRecorder::default()).unwrap();
    assert_eq!(summary.paths_explored, 1);
    assert_eq!(summary.max_depth, 0);

    let config = Config::from_args(&["+cg.enumerate_random=true"]).unwrap();
    let mut enumerated = Search::new(SearchConfig::from_config(&config));
    let summary = enumerated.run(program, &mut PathRecorder::default()).unwrap();
    assert_eq!(summary.paths_explored, 6);
}

#[test]
fn test_enumerated_random_values_cover_extremes() {
    let config = SearchConfig {
        enumerate_random: true,
        multiple_errors: true,
        ..SearchConfig::default()
    };
    let mut search = Search::new(config);
    let seen = std::cell::RefCell::new(Vec::new());
    search
        .run(
            |ctx| {
                seen.borrow_mut().push(ctx.random_long());
                Ok(())
            },
            &mut PathRecorder::default(),
        )
        .unwrap();
    assert_eq!(*seen.borrow(), vec![i64::MIN, 0, i64::MAX]);
}

#[test]
fn test_replay_divergence_is_an_error() {
    let runs = Cell::new(0);
    let mut search = Search::new(SearchConfig::default());
    let result = search.run(
        |ctx| {
            runs.set(runs.get() + 1);
            if runs.get() == 1 {
                ctx.verify_bool();
            } else {
                ctx.verify_int(0, 1);
            }
            Ok(())
        },
        &mut PathRecorder::default(),
    );
    assert!(matches!(
        result,
        Err(SearchError::ReplayDivergence { depth: 0, .. })
    ));
}

#[test]
fn test_empty_interval_is_an_error() {
    let mut search = Search::new(SearchConfig::default());
    let result = search.run(
        |ctx| {
            ctx.verify_int(5, 1);
            Ok(())
        },
        &mut PathRecorder::default(),
    );
    assert!(matches!(result, Err(SearchError::EmptyChoice { .. })));
}

#[test]
fn test_depth_limit_truncates_paths() {
    let config = Config::from_args(&["+search.depth_limit=1"]).unwrap();
    let mut search = Search::new(SearchConfig::from_config(&config));
    let summary = search
        .run(
            |ctx| {
                ctx.verify_bool();
                ctx.verify_bool();
                Ok(())
            },
            &mut PathRecorder::default(),
        )
        .unwrap();
    assert_eq!(summary.paths_explored, 2);
    assert_eq!(summary.truncated_paths, 2);
    assert_eq!(summary.max_depth, 1);
}

#[test]
fn test_locations_and_schedules_reach_listeners() {
    let mut search = Search::new(SearchConfig::default());
    let mut recorder = PathRecorder::default();
    let threads = [ThreadInfo::new(0, "main"), ThreadInfo::new(1, "worker")];
    search
        .run(
            |ctx| {
                let first = ctx.at("Racer.rs:12").schedule("START", &threads);
                let flag = ctx.verify_bool();
                if first == 1 && flag {
                    return Err(Violation::exception("race"));
                }
                Ok(())
            },
            &mut recorder,
        )
        .unwrap();

    assert_eq!(
        recorder.locations,
        vec![Some("Racer.rs:12".to_string()), None]
    );
    assert_eq!(
        recorder.violations[0][0],
        "pathtrace::choice::ThreadChoiceFromSet {id:\"START\" ,2/2,isCascaded:false}"
    );
}

#[test]
fn test_drawn_random_value_does_not_leak_its_location() {
    let mut search = Search::new(SearchConfig::default());
    let mut recorder = PathRecorder::default();
    search
        .run(
            |ctx| {
                ctx.at("Drawn.rs:1").random_bool();
                ctx.at("Drawn.rs:2").random_int(0);
                ctx.at("Drawn.rs:3").random_double();
                ctx.verify_bool();
                Err(Violation::exception("always"))
            },
            &mut recorder,
        )
        .unwrap();
    assert_eq!(recorder.locations, vec![None]);
}

#[test]
fn test_interval_at_lowest_bound_is_explored() {
    let mut search = Search::new(SearchConfig {
        multiple_errors: true,
        ..SearchConfig::default()
    });
    let mut recorder = PathRecorder::default();
    let summary = search
        .run(
            |ctx| {
                let n = ctx.verify_int(i64::MIN, i64::MIN + 1);
                Err(Violation::exception(n.to_string()))
            },
            &mut recorder,
        )
        .unwrap();
    assert_eq!(summary.paths_explored, 2);
    let messages: Vec<&str> = summary
        .violations
        .iter()
        .map(|record| record.violation.message.as_str())
        .collect();
    assert_eq!(messages, vec!["-9223372036854775808", "-9223372036854775807"]);
}
