//! Command parser.
//!
//! Parses incoming protocol lines into structured `Command` variants that
//! the main loop dispatches on.

/// Arguments of the `simulate` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulateParams {
    pub attacker: String,
    pub operation: String,
    pub target: String,
    pub trials: Option<usize>,
    pub threads: Option<usize>,
}

/// A parsed client-to-engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Protocol handshake.
    Opi,

    /// Synchronization ping; engine must reply `readyok`.
    IsReady,

    /// Set an engine option: `setoption name <id> [value <x>]`.
    SetOption { name: String, value: Option<String> },

    /// Load a JSON ruleset from a path.
    Ruleset { path: String },

    /// Register or replace a dominion from notation.
    Dominion { notation: String },

    /// Register or replace a dominion from its JSON form:
    /// `dominion json <object>`.
    DominionJson { json: String },

    /// Print a dominion's notation.
    Show { name: String },

    /// Resolve one operation: `op <attacker> <operation> <target>`.
    Op {
        attacker: String,
        operation: String,
        target: String,
    },

    /// Estimate an operation's odds over many seeded trials.
    Simulate(SimulateParams),

    /// Forget all dominions.
    NewRound,

    /// Terminate the engine process.
    Quit,
}

/// Parses a single line of input into a `Command`.
///
/// Returns `None` for empty lines or unrecognized commands. Malformed
/// arguments for known commands also return `None` after logging a warning.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    match tokens[0] {
        "opi" => Some(Command::Opi),
        "isready" => Some(Command::IsReady),
        "quit" => Some(Command::Quit),
        "newround" => Some(Command::NewRound),

        "setoption" => parse_setoption(&tokens),
        "ruleset" => parse_ruleset(&tokens, trimmed),
        "dominion" => parse_dominion(&tokens, trimmed),
        "show" => parse_show(&tokens),
        "op" => parse_op(&tokens),
        "simulate" => parse_simulate(&tokens),

        other => {
            log::warn!("unknown command: {}", other);
            None
        }
    }
}

/// Parses `setoption name <id> [value <x>]`.
fn parse_setoption(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 3 || tokens[1] != "name" {
        log::warn!("malformed setoption: expected 'setoption name <id> [value <x>]'");
        return None;
    }

    let value_idx = tokens.iter().position(|&t| t == "value");

    let (name, value) = match value_idx {
        Some(vi) => {
            let name_parts = &tokens[2..vi];
            let value_parts = &tokens[vi + 1..];
            if name_parts.is_empty() {
                log::warn!("malformed setoption: empty name");
                return None;
            }
            let value = if value_parts.is_empty() {
                None
            } else {
                Some(value_parts.join(" "))
            };
            (name_parts.join(" "), value)
        }
        None => (tokens[2..].join(" "), None),
    };

    Some(Command::SetOption { name, value })
}

/// Parses `ruleset <path>`; the path may contain spaces.
fn parse_ruleset(tokens: &[&str], full_line: &str) -> Option<Command> {
    if tokens.len() < 2 {
        log::warn!("malformed ruleset: expected 'ruleset <path>'");
        return None;
    }
    let path = full_line
        .strip_prefix("ruleset")
        .unwrap_or("")
        .trim()
        .to_string();
    Some(Command::Ruleset { path })
}

/// Parses `dominion <notation>` or `dominion json <object>`.
fn parse_dominion(tokens: &[&str], full_line: &str) -> Option<Command> {
    if tokens.get(1) == Some(&"json") {
        let json = full_line
            .strip_prefix("dominion")
            .and_then(|rest| rest.trim_start().strip_prefix("json"))
            .unwrap_or("")
            .trim();
        if json.is_empty() {
            log::warn!("malformed dominion: expected 'dominion json <object>'");
            return None;
        }
        return Some(Command::DominionJson {
            json: json.to_string(),
        });
    }
    if tokens.len() != 2 {
        log::warn!("malformed dominion: expected 'dominion <notation>'");
        return None;
    }
    Some(Command::Dominion {
        notation: tokens[1].to_string(),
    })
}

/// Parses `show <name>`.
fn parse_show(tokens: &[&str]) -> Option<Command> {
    if tokens.len() != 2 {
        log::warn!("malformed show: expected 'show <name>'");
        return None;
    }
    Some(Command::Show {
        name: tokens[1].to_string(),
    })
}

/// Parses `op <attacker> <operation> <target>`.
fn parse_op(tokens: &[&str]) -> Option<Command> {
    if tokens.len() != 4 {
        log::warn!("malformed op: expected 'op <attacker> <operation> <target>'");
        return None;
    }
    Some(Command::Op {
        attacker: tokens[1].to_string(),
        operation: tokens[2].to_string(),
        target: tokens[3].to_string(),
    })
}

/// Parses `simulate <attacker> <operation> <target> [trials <n>] [threads <n>]`.
fn parse_simulate(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 4 {
        log::warn!("malformed simulate: expected 'simulate <attacker> <operation> <target>'");
        return None;
    }
    let mut params = SimulateParams {
        attacker: tokens[1].to_string(),
        operation: tokens[2].to_string(),
        target: tokens[3].to_string(),
        trials: None,
        threads: None,
    };

    let mut i = 4;
    while i < tokens.len() {
        match tokens[i] {
            "trials" | "threads" => {
                let key = tokens[i];
                i += 1;
                if i < tokens.len() {
                    match tokens[i].parse::<usize>() {
                        Ok(v) if key == "trials" => params.trials = Some(v),
                        Ok(v) => params.threads = Some(v),
                        Err(_) => log::warn!("invalid {} value: '{}'", key, tokens[i]),
                    }
                }
            }
            other => log::warn!("unknown simulate parameter: '{}'", other),
        }
        i += 1;
    }

    Some(Command::Simulate(params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("opi"), Some(Command::Opi));
        assert_eq!(parse_command("isready"), Some(Command::IsReady));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
        assert_eq!(parse_command("newround"), Some(Command::NewRound));
    }

    #[test]
    fn parse_empty_line_returns_none() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("\t"), None);
    }

    #[test]
    fn parse_unknown_command_returns_none() {
        assert_eq!(parse_command("foobar"), None);
    }

    #[test]
    fn parse_setoption_with_value() {
        assert_eq!(
            parse_command("setoption name Seed value 42"),
            Some(Command::SetOption {
                name: "Seed".to_string(),
                value: Some("42".to_string()),
            })
        );
    }

    #[test]
    fn parse_setoption_no_value() {
        assert_eq!(
            parse_command("setoption name ForceOutcome"),
            Some(Command::SetOption {
                name: "ForceOutcome".to_string(),
                value: None,
            })
        );
    }

    #[test]
    fn parse_setoption_malformed_returns_none() {
        assert_eq!(parse_command("setoption"), None);
        assert_eq!(parse_command("setoption foo"), None);
        assert_eq!(parse_command("setoption name value 3"), None);
    }

    #[test]
    fn parse_ruleset_keeps_spaces_in_path() {
        assert_eq!(
            parse_command("ruleset /tmp/my rules.json"),
            Some(Command::Ruleset {
                path: "/tmp/my rules.json".to_string(),
            })
        );
        assert_eq!(parse_command("ruleset"), None);
    }

    #[test]
    fn parse_dominion_and_show() {
        assert_eq!(
            parse_command("dominion shire:halfling:military_spies=10"),
            Some(Command::Dominion {
                notation: "shire:halfling:military_spies=10".to_string(),
            })
        );
        assert_eq!(
            parse_command("show shire"),
            Some(Command::Show {
                name: "shire".to_string(),
            })
        );
        assert_eq!(parse_command("dominion"), None);
        assert_eq!(parse_command("dominion json"), None);
        assert_eq!(parse_command("show"), None);
    }

    #[test]
    fn parse_dominion_json_keeps_whole_object() {
        assert_eq!(
            parse_command(r#"dominion json {"name": "shire", "race": {"name": "Halfling"}}"#),
            Some(Command::DominionJson {
                json: r#"{"name": "shire", "race": {"name": "Halfling"}}"#.to_string(),
            })
        );
    }

    #[test]
    fn parse_op() {
        assert_eq!(
            parse_command("op shire barracks_spy caravan"),
            Some(Command::Op {
                attacker: "shire".to_string(),
                operation: "barracks_spy".to_string(),
                target: "caravan".to_string(),
            })
        );
        assert_eq!(parse_command("op shire barracks_spy"), None);
    }

    #[test]
    fn parse_simulate_with_params() {
        assert_eq!(
            parse_command("simulate a castle_spy b trials 500 threads 2"),
            Some(Command::Simulate(SimulateParams {
                attacker: "a".to_string(),
                operation: "castle_spy".to_string(),
                target: "b".to_string(),
                trials: Some(500),
                threads: Some(2),
            }))
        );
    }

    #[test]
    fn parse_simulate_ignores_bad_values() {
        let Some(Command::Simulate(params)) = parse_command("simulate a castle_spy b trials x")
        else {
            panic!("expected simulate");
        };
        assert_eq!(params.trials, None);
        assert_eq!(parse_command("simulate a b"), None);
    }
}
