use std::{collections::BTreeSet, fmt::Write, fs, path::PathBuf};

use cordyceps_avl::{command, AvlSet};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

// Every `<n>test.txt` must have a matching `<n>answer.txt`.
fn fixture_pairs() -> Vec<(String, PathBuf, PathBuf)> {
    let dir = fixtures_dir();
    let mut pairs = Vec::new();

    for entry in fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_str().unwrap().to_owned();

        if let Some(id) = name.strip_suffix("test.txt") {
            let answer = dir.join(format!("{id}answer.txt"));
            assert!(answer.exists(), "no answer file for fixture {name}");
            pairs.push((id.to_owned(), path, answer));
        }
    }

    pairs.sort();
    pairs
}

// Replays a command script against a `BTreeSet`, producing the expected interpreter output.
fn model_output(input: &str) -> String {
    let mut keys = BTreeSet::new();
    let mut out = String::new();
    let mut tokens = input.split_whitespace();

    while let Some(token) = tokens.next() {
        let mut operand = || tokens.next().unwrap().parse::<i64>().unwrap();

        match token {
            "k" => {
                keys.insert(operand());
            }
            "q" => {
                let (low, high) = (operand(), operand());
                let count = if low >= high {
                    0
                } else {
                    keys.range(low..=high).count()
                };
                write!(out, "{count} ").unwrap();
            }
            _ => {}
        }
    }

    out.push('\n');
    out
}

#[test]
fn fixtures_match_answers() {
    let pairs = fixture_pairs();
    assert!(!pairs.is_empty());

    for (id, test, answer) in pairs {
        let input = fs::read_to_string(&test).unwrap();
        let expected = fs::read_to_string(&answer).unwrap();

        let actual = command::process_str(&input).unwrap();
        assert_eq!(expected, actual, "fixture {id}");
    }
}

#[test]
fn final_tree_is_balanced() {
    for (id, test, _) in fixture_pairs() {
        let file = fs::File::open(&test).unwrap();
        let mut set = AvlSet::new();
        let mut output = Vec::new();

        command::run(std::io::BufReader::new(file), &mut output, &mut set).unwrap();

        set.assert_invariants();
        assert!(
            set.iter().zip(set.iter().skip(1)).all(|(a, b)| a < b),
            "fixture {id} keys out of order"
        );
    }
}

#[test]
fn fixture_answers_count_queries() {
    for (id, test, answer) in fixture_pairs() {
        let input = fs::read_to_string(&test).unwrap();
        let expected = fs::read_to_string(&answer).unwrap();

        let queries = input.split_whitespace().filter(|t| *t == "q").count();
        assert_eq!(
            queries,
            expected.split_whitespace().count(),
            "fixture {id}"
        );
    }
}

#[test]
fn fixture_answers_agree_with_model() {
    for (id, test, answer) in fixture_pairs() {
        let input = fs::read_to_string(&test).unwrap();
        let expected = fs::read_to_string(&answer).unwrap();

        assert_eq!(expected, model_output(&input), "fixture {id}");
    }
}

#[derive(Clone, Debug)]
enum Command {
    Insert(i64),
    Query(i64, i64),
}

fn command_strategy(max_key: i64) -> impl Strategy<Value = Command> {
    prop_oneof![
        (1..=max_key).prop_map(Command::Insert),
        (1..=max_key, 1..=max_key).prop_map(|(low, high)| Command::Query(low, high)),
    ]
}

fn script(commands: &[Command]) -> String {
    let mut input = String::new();
    for command in commands {
        match command {
            Command::Insert(key) => write!(input, "k {key} ").unwrap(),
            Command::Query(low, high) => write!(input, "q {low} {high} ").unwrap(),
        }
    }
    input
}

proptest! {
    #[test]
    fn random_scripts_match_model(commands in proptest::collection::vec(command_strategy(2000), 0..1500)) {
        let input = script(&commands);
        prop_assert_eq!(command::process_str(&input).unwrap(), model_output(&input));
    }

    #[test]
    fn dense_scripts_match_model(commands in proptest::collection::vec(command_strategy(30), 0..300)) {
        let input = script(&commands);
        prop_assert_eq!(command::process_str(&input).unwrap(), model_output(&input));
    }
}
