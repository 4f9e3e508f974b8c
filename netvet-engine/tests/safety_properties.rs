//! Property tests for the command deny list.

use netvet_common::Command;
use netvet_common::testing::init_global_test_logging;
use netvet_engine::BlockList;
use proptest::prelude::*;

#[ctor::ctor]
fn setup() {
    init_global_test_logging();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn dangerous_prefixes_are_always_blocked(
        prefix in prop::sample::select(vec!["reload", "conf", "configure", "wr", "write"]),
        rest in "[ a-z0-9/-]{0,20}",
    ) {
        let list = BlockList::builtin().unwrap();
        let command = format!("{prefix}{rest}");
        prop_assert!(list.matching_pattern(&command).is_some());
    }

    #[test]
    fn show_commands_are_never_blocked(rest in "[ a-z0-9/-]{0,30}") {
        let list = BlockList::builtin().unwrap();
        let command = format!("show {rest}");
        prop_assert!(list.matching_pattern(&command).is_none());
    }

    #[test]
    fn first_blocked_command_is_reported(position in 0usize..5) {
        let list = BlockList::builtin().unwrap();
        let mut commands: Vec<Command> = (0..5)
            .map(|i| Command::new(format!("show interfaces ethernet {i}")))
            .collect();
        commands[position] = Command::new("reload in 5");
        if position < 4 {
            commands[4] = Command::new("write memory");
        }

        let blocked = list.check(&commands).unwrap();
        prop_assert_eq!(blocked.command, "reload in 5");
        prop_assert_eq!(blocked.pattern, "^reload.*");
    }
}
