#![allow(clippy::disallowed_macros)]

use std::process::Command;

fn main() {
	let git_hash = run_command("git", &["rev-parse", "--short", "HEAD"]);
	println!("cargo:rustc-env=BUSWATCH_GIT_HASH={}", git_hash);

	let dirty = run_command("git", &["status", "--porcelain"]);
	let dirty_flag = if dirty.is_empty() || dirty == "unknown" { "" } else { "-dirty" };
	println!("cargo:rustc-env=BUSWATCH_GIT_DIRTY={}", dirty_flag);

	let build_date = run_command("date", &["+%Y-%m-%d %H:%M:%S"]);
	println!("cargo:rustc-env=BUSWATCH_BUILD_DATE={}", build_date);

	println!("cargo:rerun-if-changed=../../.git/HEAD");
	println!("cargo:rerun-if-changed=../../.git/refs");
}

fn run_command(cmd: &str, args: &[&str]) -> String {
	Command::new(cmd)
		.args(args)
		.output()
		.ok()
		.filter(|output| output.status.success())
		.and_then(|output| String::from_utf8(output.stdout).ok())
		.unwrap_or_else(|| "unknown".into())
		.trim()
		.to_string()
}
