//! Drives the `kitsmith` binary against a simulated world fixture.

use std::path::Path;
use std::process::{Command, Output};

const FIXTURE: &str = r#"{
    "actor": "0,64,0",
    "containers": [
        {
            "block": {"position": "2,64,2", "name": "chest", "facing": "north", "chest": "left"},
            "capacity": 54,
            "slots": [{"id": 30, "name": "shulker_box", "count": 1,
                       "contents": [{"id": 10, "name": "golden_apple", "count": 64}]}]
        },
        {
            "block": {"position": "3,64,2", "name": "chest", "facing": "north", "chest": "right"}
        }
    ],
    "inventory": [{"id": 20, "name": "diamond_pickaxe", "count": 1}]
}"#;

struct Env {
    dir: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("world.json"), FIXTURE).unwrap();
        let index = dir.path().join("index.json");
        std::fs::write(
            dir.path().join("config.toml"),
            format!("[index]\npath = {:?}\n", index.display().to_string()),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_kitsmith"))
            .env("HOME", self.dir.path())
            .env_remove("RUST_LOG")
            .args(["--config", &self.path("config.toml"), "--world", &self.path("world.json")])
            .args(args)
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn scan_then_show_index() {
    let env = Env::new();

    let scan = env.run(&["scan"]);
    assert!(scan.status.success(), "{}", String::from_utf8_lossy(&scan.stderr));
    assert!(stdout(&scan).contains("Finished scanning all 1 double chests in a 64 block radius."));
    assert!(Path::new(&env.path("index.json")).exists());

    let show = env.run(&["index", "show"]);
    assert!(show.status.success());
    let text = stdout(&show);
    assert!(text.contains("2,64,2: golden_apple (10)"), "{text}");
    assert!(text.contains("1 containers, 1 item types"));
}

#[test]
fn failed_stage_exits_nonzero() {
    let env = Env::new();
    let output = env.run(&["acquire", "moon_rock"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown item: moon_rock"));
}

#[test]
fn config_path_and_show() {
    let env = Env::new();

    let path = env.run(&["config", "path"]);
    assert_eq!(stdout(&path).trim(), env.path("config.toml"));

    let show = env.run(&["config", "show"]);
    assert!(show.status.success());
    let parsed: toml::Value = toml::from_str(&stdout(&show)).unwrap();
    assert_eq!(parsed["index"]["path"].as_str().unwrap(), env.path("index.json"));
}
