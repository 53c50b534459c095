use super::*;

fn parse_args(argv: &[&str]) -> Args {
    Args::try_parse_from(argv)
        .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
}

#[test]
fn no_subcommand_means_chat() {
    let args = parse_args(&["council"]);
    assert!(args.command.is_none());
    assert!(args.base_url.is_none());
}

#[test]
fn chat_accepts_conversation_and_global_flags() {
    let args = parse_args(&[
        "council",
        "chat",
        "--conversation",
        "abc",
        "--base-url",
        "http://council.lan:8001",
        "--log",
        "/tmp/council.log",
    ]);
    match args.command {
        Some(Commands::Chat { conversation }) => assert_eq!(conversation.as_deref(), Some("abc")),
        _ => panic!("expected chat"),
    }
    assert_eq!(args.base_url.as_deref(), Some("http://council.lan:8001"));
    assert_eq!(args.log, Some(PathBuf::from("/tmp/council.log")));
}

#[test]
fn ask_collects_the_whole_prompt() {
    let args = parse_args(&["council", "ask", "why", "is", "the", "sky", "-blue?"]);
    match args.command {
        Some(Commands::Ask { prompt }) => assert_eq!(prompt.join(" "), "why is the sky -blue?"),
        _ => panic!("expected ask"),
    }
}

#[test]
fn models_takes_repeated_council_flags() {
    let args = parse_args(&[
        "council", "models", "c1", "--council", "a/one", "--council", "b/two", "--chairman",
        "c/chair",
    ]);
    match args.command {
        Some(Commands::Models {
            id,
            council,
            chairman,
        }) => {
            assert_eq!(id.as_deref(), Some("c1"));
            assert_eq!(council, ["a/one", "b/two"]);
            assert_eq!(chairman.as_deref(), Some("c/chair"));
        }
        _ => panic!("expected models"),
    }
}

#[test]
fn model_overrides_need_a_conversation() {
    assert!(Args::try_parse_from(["council", "models", "--chairman", "c/chair"]).is_err());
    assert!(matches!(
        parse_args(&["council", "models"]).command,
        Some(Commands::Models { id: None, .. })
    ));
}

#[test]
fn preset_save_requires_council_and_chairman() {
    assert!(Args::try_parse_from(["council", "preset-save", "--name", "x"]).is_err());
    let args = parse_args(&[
        "council",
        "preset-save",
        "--name",
        "Fast",
        "--council",
        "a/one",
        "--chairman",
        "c/chair",
    ]);
    assert!(matches!(
        args.command,
        Some(Commands::PresetSave { ref name, .. }) if name == "Fast"
    ));
}

#[test]
fn preset_apply_takes_preset_then_conversation() {
    match parse_args(&["council", "preset-apply", "custom_fast", "c1"]).command {
        Some(Commands::PresetApply {
            preset,
            conversation,
        }) => {
            assert_eq!(preset, "custom_fast");
            assert_eq!(conversation, "c1");
        }
        _ => panic!("expected preset-apply"),
    }
}

#[test]
fn set_without_key_is_allowed() {
    match parse_args(&["council", "set"]).command {
        Some(Commands::Set { key, value }) => {
            assert!(key.is_none());
            assert!(value.is_empty());
        }
        _ => panic!("expected set"),
    }
    match parse_args(&["council", "set", "base-url", "http://x:1"]).command {
        Some(Commands::Set { key, value }) => {
            assert_eq!(key.as_deref(), Some("base-url"));
            assert_eq!(value, ["http://x:1"]);
        }
        _ => panic!("expected set"),
    }
}
