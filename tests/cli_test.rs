// tests/cli_test.rs
use medialoader::cli::build_cli;

#[test]
fn test_cli_basic_structure() {
    let app = build_cli();

    assert_eq!(app.get_name(), "medialoader");

    // A bare invocation fails because a subcommand is required
    let matches = app.clone().try_get_matches_from(vec!["medialoader"]);
    assert!(matches.is_err());
}

#[test]
fn test_catalog_subcommand() {
    let app = build_cli();
    let matches = app
        .try_get_matches_from(vec!["medialoader", "catalog", "info.json"])
        .unwrap();

    let (name, sub) = matches.subcommand().unwrap();
    assert_eq!(name, "catalog");
    assert_eq!(sub.get_one::<String>("file").unwrap(), "info.json");
}

#[test]
fn test_select_subcommand() {
    let app = build_cli();
    let matches = app
        .clone()
        .try_get_matches_from(vec![
            "medialoader",
            "select",
            "info.json",
            "--mode",
            "video",
            "--container",
            "mp4",
            "--codec",
            "avc1",
        ])
        .unwrap();

    let (_, sub) = matches.subcommand().unwrap();
    assert_eq!(sub.get_one::<String>("mode").unwrap(), "video");
    assert_eq!(sub.get_one::<String>("container").unwrap(), "mp4");
    assert_eq!(sub.get_one::<String>("codec").unwrap(), "avc1");

    // The mode value set is closed
    let result = app.try_get_matches_from(vec![
        "medialoader",
        "select",
        "info.json",
        "--mode",
        "both",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_ranges_subcommand() {
    let app = build_cli();
    let matches = app
        .try_get_matches_from(vec![
            "medialoader",
            "ranges",
            "1-3,7,10-",
            "--index",
            "7",
            "--quiet",
        ])
        .unwrap();

    let (_, sub) = matches.subcommand().unwrap();
    assert_eq!(sub.get_one::<String>("spec").unwrap(), "1-3,7,10-");
    assert_eq!(sub.get_one::<u64>("index").copied(), Some(7));
    assert!(sub.get_flag("quiet"));
}
