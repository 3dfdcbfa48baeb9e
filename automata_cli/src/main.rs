mod repl;

use std::io;

use clap::{arg, command, ArgAction, ArgMatches, Command};

use crate::repl::Session;

fn cli() -> Command {
    command!()
        .about("Builds the minimal DFA of a regular expression and checks strings against it")
        .arg(arg!(-q --quiet "Don't print the syntax tree and the intermediate automata"))
        .arg(
            arg!([REGEX])
                .help("Pattern to evaluate once instead of starting the interactive loop"),
        )
        .arg(
            arg!(-c --check <STRING>)
                .help("String to check against REGEX, may be repeated")
                .action(ArgAction::Append)
                .requires("REGEX"),
        )
}

fn exec(args: &ArgMatches) -> anyhow::Result<()> {
    let quiet = args.get_flag("quiet");

    match args.get_one::<String>("REGEX") {
        Some(pattern) => {
            let inputs: Vec<String> = args
                .get_many::<String>("check")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            repl::evaluate(&mut io::stdout().lock(), pattern, &inputs, quiet)
        }
        None => Session::new(io::stdin().lock(), io::stdout().lock(), quiet).run(),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    exec(&cli().get_matches())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn command_is_well_formed() {
        cli().debug_assert();
    }

    #[rstest]
    #[case(&["automata"], None, 0, false)]
    #[case(&["automata", "-q", "a|b"], Some("a|b"), 0, true)]
    #[case(&["automata", "ab*", "-c", "a", "-c", "abb"], Some("ab*"), 2, false)]
    #[case(&["automata", "--check", "b", "--quiet", "a"], Some("a"), 1, true)]
    fn parses_arguments(
        #[case] argv: &[&str],
        #[case] regex: Option<&str>,
        #[case] checks: usize,
        #[case] quiet: bool,
    ) {
        // when
        let args = cli().try_get_matches_from(argv).unwrap();

        // then
        assert_eq!(args.get_one::<String>("REGEX").map(String::as_str), regex);
        assert_eq!(args.get_many::<String>("check").map_or(0, |v| v.count()), checks);
        assert_eq!(args.get_flag("quiet"), quiet);
    }

    #[test]
    fn check_without_regex_is_rejected() {
        assert!(cli().try_get_matches_from(["automata", "-c", "a"]).is_err());
    }
}
