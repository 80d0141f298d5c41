//! Show command - displays information.

use anyhow::Result;

use pharc::config::Config;
use pharc::layout;
use pharc::stub::{self, RuntimeEnv};

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
    /// Print the generated stub
    Stub,
    /// Show the stub's terminal detection for this process
    Terminal,
}

/// Execute the show command.
pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => config.print(),
        ShowTarget::Stub => println!("{}", stub::generate(&layout::phing_stub())),
        ShowTarget::Terminal => {
            let env = RuntimeEnv::detect();
            let injection = layout::phing_stub().logger_injection();
            let args: Vec<String> = std::env::args().take(1).collect();
            println!("Terminal:");
            println!("  windows: {}", env.windows);
            println!("  ANSICON: {}", env.ansicon.as_deref().unwrap_or("(unset)"));
            println!(
                "  ConEmuANSI: {}",
                env.conemu_ansi.as_deref().unwrap_or("(unset)")
            );
            match env.stdout_tty {
                Some(tty) => println!("  stdout is a tty: {}", tty),
                None => println!("  stdout is a tty: (unknown)"),
            }
            if injection.should_inject(&env, &args) {
                println!("  logger: {} {}", injection.flag, injection.class);
            } else {
                println!("  logger: default");
            }
        }
    }
    Ok(())
}
