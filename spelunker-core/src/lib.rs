pub mod explore;
pub mod map;
pub mod report;

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
   ___  ___  ___  _    _   _  _  _ _  _____ ___
  / __|| _ \| __|| |  | | | || \| || |/ / __| _ \
  \__ \|  _/| _| | |__| |_| || .` || ' <| _||   /
  |___/|_|  |___||____|\___/ |_|\_||_|\_\___|_|_\
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "labyrinth explorer".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
