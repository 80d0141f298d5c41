//! Bootstrap stub placed ahead of the phar payload.
//!
//! The stub is plain PHP: it maps the archive under its alias, points the
//! runtime at paths inside the archive, optionally switches to the colouring
//! logger, then loads the autoloader and hands off to the entry point.
//!
//! The terminal check the stub performs at run time is mirrored by
//! [`RuntimeEnv`] and [`LoggerInjection`] so it can be exercised without a
//! real terminal.

use std::io::IsTerminal;

use crate::archive::format::HALT_COMPILER;

pub const SHEBANG: &str = "#!/usr/bin/env php";

/// Fixed parameters of the generated stub. Paths are relative to the archive.
#[derive(Debug, Clone)]
pub struct StubConfig {
    pub alias: String,
    /// Comment lines placed at the top of the PHP block.
    pub header: Vec<String>,
    pub home_env: String,
    pub home_path: String,
    pub include_paths: Vec<String>,
    pub logger_flag: String,
    pub logger_class: String,
    pub autoloader: String,
    pub entry_point: String,
}

impl StubConfig {
    /// `phar://<alias>/<path>`
    pub fn phar_url(&self, path: &str) -> String {
        format!("phar://{}/{}", self.alias, path.trim_start_matches('/'))
    }

    pub fn logger_injection(&self) -> LoggerInjection {
        LoggerInjection {
            flag: self.logger_flag.clone(),
            class: self.logger_class.clone(),
        }
    }
}

/// Quote `s` as a PHP single-quoted string literal.
fn php_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Render the stub text.
pub fn generate(config: &StubConfig) -> String {
    let mut out = String::new();
    out.push_str(SHEBANG);
    out.push('\n');
    out.push_str("<?php\n");

    if !config.header.is_empty() {
        out.push_str("/*\n");
        for line in &config.header {
            if line.is_empty() {
                out.push_str(" *\n");
            } else {
                out.push_str(&format!(" * {}\n", line.replace("*/", "* /")));
            }
        }
        out.push_str(" */\n");
    }
    out.push('\n');

    out.push_str("ini_set('html_errors', 'off');\n\n");
    out.push_str(&format!("Phar::mapPhar({});\n\n", php_str(&config.alias)));
    out.push_str(&format!(
        "putenv({});\n\n",
        php_str(&format!(
            "{}={}",
            config.home_env,
            config.phar_url(&config.home_path)
        ))
    ));

    out.push_str("set_include_path(implode(PATH_SEPARATOR, array(\n");
    for path in &config.include_paths {
        out.push_str(&format!("    {},\n", php_str(&config.phar_url(path))));
    }
    out.push_str(")));\n\n");

    let flag = php_str(&config.logger_flag);
    out.push_str(&format!(
        "\
if (
    !in_array({flag}, $argv) &&
    (
        (
            defined('PHP_WINDOWS_VERSION_BUILD') &&
            (
                false !== getenv('ANSICON') ||
                'ON' === getenv('ConEmuANSI')
            )
        ) ||
        (
            function_exists('posix_isatty') &&
            @posix_isatty(STDOUT)
        )
    )) {{
    $argv[] = {flag};
    $argv[] = {class};
    $argc += 2;
}}

",
        class = php_str(&config.logger_class),
    ));

    out.push_str(&format!(
        "$loader = require {};\n\n",
        php_str(&config.phar_url(&config.autoloader))
    ));
    out.push_str(&format!(
        "require {};\n\n",
        php_str(&config.phar_url(&config.entry_point))
    ));
    out.push_str(HALT_COMPILER);
    out
}

/// What the stub can observe about the process it runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    /// `PHP_WINDOWS_VERSION_BUILD` is defined.
    pub windows: bool,
    /// Value of `ANSICON`, if set.
    pub ansicon: Option<String>,
    /// Value of `ConEmuANSI`, if set.
    pub conemu_ansi: Option<String>,
    /// `posix_isatty(STDOUT)`; `None` when the posix extension is missing.
    pub stdout_tty: Option<bool>,
}

impl RuntimeEnv {
    /// Probe the current process.
    pub fn detect() -> Self {
        Self {
            windows: cfg!(windows),
            ansicon: std::env::var("ANSICON").ok(),
            conemu_ansi: std::env::var("ConEmuANSI").ok(),
            stdout_tty: if cfg!(unix) {
                Some(std::io::stdout().is_terminal())
            } else {
                None
            },
        }
    }

    /// Whether the stub would consider stdout ANSI-capable.
    pub fn supports_ansi(&self) -> bool {
        let windows_ansi = self.windows
            && (self.ansicon.is_some() || self.conemu_ansi.as_deref() == Some("ON"));
        windows_ansi || self.stdout_tty == Some(true)
    }
}

/// The logger arguments the stub appends to `$argv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerInjection {
    pub flag: String,
    pub class: String,
}

impl LoggerInjection {
    pub fn should_inject(&self, env: &RuntimeEnv, args: &[String]) -> bool {
        !args.iter().any(|a| *a == self.flag) && env.supports_ansi()
    }

    /// The arguments the packaged entry point ends up seeing.
    pub fn apply(&self, env: &RuntimeEnv, args: &[String]) -> Vec<String> {
        let mut out = args.to_vec();
        if self.should_inject(env, args) {
            out.push(self.flag.clone());
            out.push(self.class.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout;

    fn config() -> StubConfig {
        layout::phing_stub()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn stub_starts_with_shebang_and_ends_with_halt() {
        let stub = generate(&config());
        assert!(stub.starts_with("#!/usr/bin/env php\n<?php\n"));
        assert!(stub.ends_with("__HALT_COMPILER();"));
    }

    #[test]
    fn stub_only_refers_to_the_archive_by_alias() {
        let stub = generate(&config());
        assert!(stub.contains("Phar::mapPhar('phing.phar');"));
        assert!(stub.contains("putenv('PHING_HOME=phar://phing.phar/vendor/phing/phing');"));
        assert!(stub.contains("'phar://phing.phar/vendor/phing/phing/classes',"));
        assert!(stub.contains("$loader = require 'phar://phing.phar/vendor/autoload.php';"));
        assert!(stub.contains("require 'phar://phing.phar/vendor/phing/phing/bin/phing.php';"));
        assert!(!stub.contains("__DIR__"));
    }

    #[test]
    fn stub_checks_posix_tty_and_windows_ansi_variables() {
        let stub = generate(&config());
        assert!(stub.contains("@posix_isatty(STDOUT)"));
        assert!(stub.contains("getenv('ANSICON')"));
        assert!(stub.contains("'ON' === getenv('ConEmuANSI')"));
        assert!(stub.contains("$argv[] = 'phing.listener.AnsiColorLogger';"));
    }

    #[test]
    fn header_cannot_close_the_comment_early() {
        let mut cfg = config();
        cfg.header = vec!["evil */ code".to_string()];
        let stub = generate(&cfg);
        assert_eq!(stub.matches("*/").count(), 1);
    }

    #[test]
    fn alias_is_escaped_in_php_literals() {
        let mut cfg = config();
        cfg.alias = "it's.phar".to_string();
        assert!(generate(&cfg).contains("Phar::mapPhar('it\\'s.phar');"));
    }

    #[test]
    fn non_interactive_stdout_never_gets_the_logger() {
        let injection = config().logger_injection();
        let env = RuntimeEnv {
            stdout_tty: Some(false),
            ..Default::default()
        };
        let out = injection.apply(&env, &args(&["phing", "build"]));
        assert_eq!(out, args(&["phing", "build"]));

        let no_posix = RuntimeEnv::default();
        assert!(!injection.should_inject(&no_posix, &args(&["phing"])));
    }

    #[test]
    fn interactive_stdout_gets_the_logger() {
        let injection = config().logger_injection();
        let env = RuntimeEnv {
            stdout_tty: Some(true),
            ..Default::default()
        };
        assert_eq!(
            injection.apply(&env, &args(&["phing"])),
            args(&["phing", "-logger", "phing.listener.AnsiColorLogger"])
        );
    }

    #[test]
    fn explicit_logger_is_left_alone() {
        let injection = config().logger_injection();
        let env = RuntimeEnv {
            stdout_tty: Some(true),
            ..Default::default()
        };
        let given = args(&["phing", "-logger", "phing.listener.DefaultLogger"]);
        assert_eq!(injection.apply(&env, &given), given);
    }

    #[test]
    fn windows_ansi_terminals_are_detected_by_environment() {
        let ansicon = RuntimeEnv {
            windows: true,
            ansicon: Some("80x25".to_string()),
            ..Default::default()
        };
        let conemu_on = RuntimeEnv {
            windows: true,
            conemu_ansi: Some("ON".to_string()),
            ..Default::default()
        };
        let conemu_off = RuntimeEnv {
            windows: true,
            conemu_ansi: Some("OFF".to_string()),
            ..Default::default()
        };
        let not_windows = RuntimeEnv {
            ansicon: Some("80x25".to_string()),
            ..Default::default()
        };
        assert!(ansicon.supports_ansi());
        assert!(conemu_on.supports_ansi());
        assert!(!conemu_off.supports_ansi());
        assert!(!not_windows.supports_ansi());
    }
}
