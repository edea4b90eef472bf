/// How a catalog command's result is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// Whole ranking as a numbered list
    List,
    /// One random pick with its poster
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Greet,
    Help,
    Catalog {
        category: &'static str,
        shape: ResultShape,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub action: Action,
}

const fn list(name: &'static str, description: &'static str, category: &'static str) -> Command {
    Command {
        name,
        description,
        action: Action::Catalog {
            category,
            shape: ResultShape::List,
        },
    }
}

const fn single(name: &'static str, description: &'static str, category: &'static str) -> Command {
    Command {
        name,
        description,
        action: Action::Catalog {
            category,
            shape: ResultShape::Single,
        },
    }
}

pub static COMMANDS: &[Command] = &[
    Command {
        name: "start",
        description: "Say hello",
        action: Action::Greet,
    },
    Command {
        name: "help",
        description: "Show this list of commands",
        action: Action::Help,
    },
    list("top", "Top from Filmaffinity", "top_filmaffinity"),
    list("top_filmaffinity", "Top from Filmaffinity", "top_filmaffinity"),
    list("top_netflix", "Top movies from Netflix", "top_netflix"),
    list("top_hbo", "Top movies from HBO", "top_hbo"),
    list("top_dvd", "Top DVD releases", "top_dvd"),
    list("top_tv_series", "Top TV series", "top_tv_series"),
    list("premieres", "Premieres", "premieres"),
    single("recommend_netflix", "Return a random movie from Netflix", "netflix"),
    single("recommend_hbo", "Return a random movie from HBO", "hbo"),
];

pub const GREETING: &str = "Hi! Send /help to see what I can do.";

pub fn lookup(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// HTML body listing every command in table order
pub fn help_text() -> String {
    let mut html = String::from("<b>Commands</b>\n");
    for command in COMMANDS {
        html.push_str(&format!("/{} - {}\n", command.name, command.description));
    }
    html
}

/// Extract the command name from message text such as `/top_hbo@FilmBot extra`.
/// Returns `None` for text that is not a command, and for commands that mention
/// a bot other than `bot_username` (compared case-insensitively).
pub fn parse_command<'a>(text: &'a str, bot_username: Option<&str>) -> Option<&'a str> {
    let first = text.trim_start().split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    let (name, mention) = match command.split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (command, None),
    };

    if let Some(mention) = mention {
        match bot_username {
            Some(own) if own.eq_ignore_ascii_case(mention) => {}
            _ => return None,
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = COMMANDS.iter().map(|c| c.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), COMMANDS.len());
    }

    #[test]
    fn test_lookup() {
        let top = lookup("top").unwrap();
        assert_eq!(
            top.action,
            Action::Catalog {
                category: "top_filmaffinity",
                shape: ResultShape::List
            }
        );
        assert_eq!(lookup("top").unwrap().action, lookup("top_filmaffinity").unwrap().action);
        assert!(matches!(
            lookup("recommend_hbo").unwrap().action,
            Action::Catalog {
                shape: ResultShape::Single,
                ..
            }
        ));
        assert!(lookup("unknown_xyz").is_none());
        assert!(lookup("TOP").is_none());
    }

    #[test]
    fn test_help_enumerates_every_command() {
        let help = help_text();
        for command in COMMANDS {
            assert!(help.contains(&format!("/{} - ", command.name)), "{}", command.name);
        }
        assert_eq!(help.matches("\n/").count(), COMMANDS.len());
    }

    #[test]
    fn test_parse_command() {
        let me = Some("FilmBot");
        assert_eq!(parse_command("/top", me), Some("top"));
        assert_eq!(parse_command("  /top_hbo@FilmBot", me), Some("top_hbo"));
        assert_eq!(parse_command("/top_hbo@filmbot", me), Some("top_hbo"));
        assert_eq!(parse_command("/premieres now please", me), Some("premieres"));
        assert_eq!(parse_command("hello", me), None);
        assert_eq!(parse_command("/", me), None);
        assert_eq!(parse_command("/@FilmBot", me), None);
        assert_eq!(parse_command("", me), None);
    }

    #[test]
    fn test_commands_for_other_bots_are_ignored() {
        let me = Some("FilmBot");
        assert_eq!(parse_command("/start@SomeOtherBot", me), None);
        assert_eq!(parse_command("/stats@OtherBot", me), None);
        assert_eq!(parse_command("/top@", me), None);
    }

    #[test]
    fn test_mentioned_commands_rejected_without_known_username() {
        assert_eq!(parse_command("/top", None), Some("top"));
        assert_eq!(parse_command("/top@FilmBot", None), None);
    }
}
