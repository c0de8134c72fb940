use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) const DEFAULT_BASE_URL: &str = "https://newrainsoftware.com/brizzo/";

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("spelunker")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("spelunker")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("explore")
                .about(
                    "Explore one or more labyrinths, discovering every reachable room by \
                forking the session token at each junction.",
                )
                .arg(
                    arg!([NAME] ...)
                        .help("Names of the labyrinths to explore")
                        .conflicts_with("names-file"),
                )
                .arg(
                    arg!(-N --"names-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of labyrinth names")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-b --"base-url" <URL>)
                        .required(false)
                        .help("Base URL of the labyrinth server")
                        .value_parser(clap::value_parser!(Url))
                        .default_value(DEFAULT_BASE_URL),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds (default: no timeout)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"stream")
                        .required(false)
                        .help("Print each room as an event-stream line as soon as it is found")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("create")
                .about("Ask the server to build a new labyrinth from a message")
                .arg(
                    arg!(-n --"name" <NAME>)
                        .required(true)
                        .help("The name of the labyrinth"),
                )
                .arg(
                    arg!(-m --"message" <TEXT>)
                        .required(true)
                        .help("The message hidden in the labyrinth"),
                )
                .arg(
                    arg!(--"shape" <SHAPE>)
                        .required(false)
                        .help("Room layout")
                        .default_value("hex"),
                )
                .arg(
                    arg!(--"seed" <SEED>)
                        .required(false)
                        .help("Generator seed")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("123"),
                )
                .arg(
                    arg!(-b --"base-url" <URL>)
                        .required(false)
                        .help("Base URL of the labyrinth server")
                        .value_parser(clap::value_parser!(Url))
                        .default_value(DEFAULT_BASE_URL),
                ),
        )
}

/// The banner goes to stdout, so it is left out when stdout carries the event stream.
pub(crate) fn shows_banner(matches: &clap::ArgMatches) -> bool {
    if matches.get_flag("quiet") {
        return false;
    }
    !matches
        .subcommand_matches("explore")
        .is_some_and(|explore| explore.get_flag("stream"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_valid() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_explore_accepts_several_names() {
        let matches = command_argument_builder()
            .try_get_matches_from(["spelunker", "explore", "blarf", "zork", "--format", "json"])
            .unwrap();
        let (_, explore) = matches.subcommand().unwrap();
        let names: Vec<&String> = explore.get_many::<String>("NAME").unwrap().collect();

        assert_eq!(names, ["blarf", "zork"]);
        assert_eq!(explore.get_one::<String>("format").unwrap(), "json");
        assert_eq!(
            explore.get_one::<Url>("base-url").unwrap().as_str(),
            DEFAULT_BASE_URL
        );
    }

    #[test]
    fn test_banner_suppressed_while_streaming() {
        let parse = |args: &[&str]| command_argument_builder().try_get_matches_from(args).unwrap();

        assert!(shows_banner(&parse(&["spelunker", "explore", "blarf"])));
        assert!(shows_banner(&parse(&["spelunker", "create", "-n", "blarf", "-m", "hi"])));
        assert!(!shows_banner(&parse(&["spelunker", "explore", "blarf", "--stream"])));
        assert!(!shows_banner(&parse(&["spelunker", "-q", "explore", "blarf"])));
    }

    #[test]
    fn test_create_requires_message() {
        let result = command_argument_builder().try_get_matches_from(["spelunker", "create", "-n", "blarf"]);
        assert!(result.is_err());
    }
}
