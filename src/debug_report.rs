use statescript::{CompileDetails, CompileError, ErrorCode, ExecutionState, Machine, TickResult};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

/// One row of the tick trace printed after `--ticks`.
pub struct TickLine {
    pub tick: usize,
    /// Current state after the tick, `None` while uninitialized or stuck.
    pub state: Option<String>,
    pub exec: ExecutionState,
    pub error: Option<ErrorCode>,
    /// Messages delivered right before the tick: key, handler result, error.
    pub delivered: Vec<(String, TickResult, Option<ErrorCode>)>,
}

pub fn print_compile<T>(name: &str, machine: &Machine<T>, details: &CompileDetails, color: bool) {
    let palette = ansi::Palette::new(color);
    println!(
        "\n{}",
        palette.bold(palette.paint(format!("⚙  Compiled: {} (machine '{}')", name, machine.name()), ansi::CYAN))
    );

    println!("\n{}", palette.paint("━━━ Stages ━━━", ansi::GRAY));
    for stage in &details.stages {
        println!(
            "  {} {}  {}",
            palette.paint(format!("{:<9}", stage.stage), ansi::BLUE),
            palette.paint(format!("✓ {:>4}", stage.produced), ansi::GREEN),
            palette.dim(format!("{:?}", stage.duration)),
        );
    }

    println!("\n{}", palette.paint("━━━ States ━━━", ansi::GRAY));
    if details.states.is_empty() {
        println!("{}", palette.dim("  No states declared"));
    }
    for state in &details.states {
        println!(
            "  {} {}  {} {}",
            palette.paint(format!("[{}]", state.id), ansi::GRAY),
            palette.bold(palette.paint(&state.name, ansi::GREEN)),
            palette.dim("│"),
            palette.paint(
                format!("enter {}  run {}  exit {}", state.enter_actions, state.run_actions, state.exit_actions),
                ansi::YELLOW
            ),
        );
        if !state.messages.is_empty() {
            println!("      {} {}", palette.dim("on:"), palette.paint(state.messages.join(", "), ansi::CYAN));
        }
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Tokens: {}  │  Actions: {}  │  Transitions: {}",
        palette.paint(format!("{:?}", details.total), ansi::GREEN),
        palette.paint(details.tokens.to_string(), ansi::BLUE),
        palette.paint(details.actions.to_string(), ansi::BLUE),
        palette.dim(details.transitions.to_string()),
    );
    println!();
}

pub fn print_compile_error(name: &str, source: &str, err: &CompileError, color: bool) {
    let palette = ansi::Palette::new(color);
    eprintln!("{} {}: {}", palette.bold(palette.paint("error:", ansi::RED)), name, err);

    let Some(line) = err.line() else {
        return;
    };
    if let Some(text) = source.lines().nth(line.saturating_sub(1)) {
        eprintln!("  {} {}", palette.paint(format!("{line:>4} │"), ansi::GRAY), text);
    }
    eprintln!("  {}", palette.dim(format!("code: {:?}", err.code())));
}

pub fn print_ticks(trace: &[TickLine], color: bool) {
    let palette = ansi::Palette::new(color);
    println!("{}", palette.paint("━━━ Ticks ━━━", ansi::GRAY));

    for line in trace {
        for (key, result, error) in &line.delivered {
            println!(
                "       {} {} {}{}",
                palette.paint("✉", ansi::CYAN),
                palette.paint(key, ansi::BLUE),
                palette.dim(format!("→ {result:?}")),
                fmt_error(*error, &palette),
            );
        }

        let state = match &line.state {
            Some(name) => palette.paint(name, ansi::GREEN),
            None => palette.dim(format!("<state {}>", line.exec.state_id)),
        };
        println!(
            "  {} {} {} {}{}",
            palette.paint(format!("#{:<4}", line.tick), ansi::GRAY),
            state,
            palette.dim("│"),
            palette.paint(format!("action {}", line.exec.action_index), ansi::YELLOW),
            fmt_error(line.error, &palette),
        );
    }
    println!();
}

fn fmt_error(error: Option<ErrorCode>, palette: &ansi::Palette) -> String {
    match error {
        Some(code) if code.is_fatal() => format!("  {}", palette.bold(palette.paint(format!("✗ {code}"), ansi::RED))),
        Some(code) => format!("  {}", palette.paint(format!("! {code}"), ansi::YELLOW)),
        None => String::new(),
    }
}
