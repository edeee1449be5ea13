pub const LOGO: &str = r#"
 _                              _       _
| |__  _   _ _____      ____ _| |_ ___| |__
| '_ \| | | / __\ \ /\ / / _` | __/ __| '_ \
| |_) | |_| \__ \\ V  V / (_| | || (__| | | |
|_.__/ \__,_|___/ \_/\_/ \__,_|\__\___|_| |_|
"#;

pub fn version() -> String {
	format!(
		"v{} ({}{}, built {})",
		env!("CARGO_PKG_VERSION"),
		env!("BUSWATCH_GIT_HASH"),
		env!("BUSWATCH_GIT_DIRTY"),
		env!("BUSWATCH_BUILD_DATE"),
	)
}

pub fn show_banner(addr: &str) {
	let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

	let info = format!(
		r#"Version:     {}
Bus:         {}
Started:     {}"#,
		version(),
		addr,
		now
	);

	println!("{}\n{}\n", LOGO.trim_end(), info);
}
