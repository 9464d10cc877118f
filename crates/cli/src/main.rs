use aarogyam_core::config::{load_clinical_source, IvrMode};
use aarogyam_core::ivr::parse_callback;
use aarogyam_core::{
    AbhaId, CoreResult, ForwardedParams, IvrConfig, IvrMachine, IvrState, Language, Step,
    Transition,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aarogyam")]
#[command(about = "Aarogyam voice line CLI")]
struct Cli {
    /// Call flow started by the welcome webhook
    #[arg(long, global = true, default_value = "language-menu")]
    mode: IvrMode,
    /// Fallback language for requests without one
    #[arg(long, global = true, default_value = "english")]
    fallback_language: Language,
    /// YAML clinical data set to use instead of the built-in demo data
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Welcome,
    LanguageSelection,
    AbhaEntry,
    MenuSelection,
}

impl From<StateArg> for IvrState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Welcome => IvrState::Welcome,
            StateArg::LanguageSelection => IvrState::LanguageSelection,
            StateArg::AbhaEntry => IvrState::AbhaEntry,
            StateArg::MenuSelection => IvrState::MenuSelection,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the TwiML one webhook would return
    Render {
        /// Webhook to call
        #[arg(value_enum)]
        state: StateArg,
        /// Keys pressed (the `Digits` field)
        #[arg(long)]
        digits: Option<String>,
        /// Forwarded `abhaId` query value
        #[arg(long)]
        abha_id: Option<String>,
        /// Forwarded `language` query value (1 or 2)
        #[arg(long)]
        language: Option<String>,
    },
    /// Simulate a call, pressing the given keys at each prompt
    Call {
        /// One entry per prompt, e.g. `1 2`
        digits: Vec<String>,
    },
    /// Print the prescriptions served for an ABHA id as JSON
    Prescriptions {
        /// ABHA id (the demo data ignores it)
        abha_id: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let source = load_clinical_source(cli.data)?;
    let machine = IvrMachine::new(IvrConfig::new(cli.mode, cli.fallback_language), source);

    match cli.command {
        Some(Commands::Render {
            state,
            digits,
            abha_id,
            language,
        }) => {
            let params = ForwardedParams::from_raw(abha_id.as_deref(), language.as_deref());
            let step = machine.advance(state.into(), &params, digits.as_deref())?;
            println!("{}", step.to_twiml()?);
        }
        Some(Commands::Call { digits }) => {
            for turn in simulate_call(&machine, &digits)? {
                println!("[{}] -> {}", turn.state.path(), describe(turn.step.next));
                for say in turn.step.response.spoken() {
                    println!(
                        "  ({}) {}",
                        say.language.as_deref().unwrap_or("-"),
                        say.plain_text()
                    );
                }
                if let Some(pressed) = turn.pressed {
                    println!("  pressed {pressed:?}");
                }
            }
        }
        Some(Commands::Prescriptions { abha_id }) => {
            let source = machine.source();
            let abha_id = match abha_id.as_deref().map(AbhaId::new) {
                Some(id) => id?,
                None => source.caller()?.abha_id,
            };
            let records = source.prescriptions(&abha_id)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        None => {
            println!("Use 'aarogyam --help' for commands");
        }
    }

    Ok(())
}

/// One webhook request made during a simulated call.
struct Turn {
    state: IvrState,
    step: Step,
    /// Keys pressed in answer to this step's prompt, if it had one.
    pressed: Option<String>,
}

/// Drive the state machine the way the telephony platform would.
///
/// Follows `Gather` actions and `Redirect` targets until the call hangs up or a prompt is left
/// unanswered because `digits` ran out.
fn simulate_call(machine: &IvrMachine, digits: &[String]) -> CoreResult<Vec<Turn>> {
    let mut turns = Vec::new();
    let mut keys = digits.iter();
    let mut state = IvrState::Welcome;
    let mut params = ForwardedParams::default();
    let mut input: Option<String> = None;

    loop {
        let step = machine.advance(state, &params, input.as_deref())?;
        let callback = match step.next {
            Transition::Await(_) => step.response.find_gather().and_then(|g| g.action.clone()),
            Transition::Restart(_) => step.response.redirect_target().map(str::to_owned),
            Transition::Hangup => None,
        };
        let pressed = match step.next {
            Transition::Await(_) => keys.next().cloned(),
            _ => None,
        };
        let awaiting = matches!(step.next, Transition::Await(_));
        turns.push(Turn {
            state,
            step,
            pressed: pressed.clone(),
        });

        if awaiting && pressed.is_none() {
            break;
        }
        let Some((next_state, next_params)) = callback.as_deref().and_then(parse_callback) else {
            break;
        };
        state = next_state;
        params = next_params;
        input = pressed;
    }

    Ok(turns)
}

fn describe(next: Transition) -> String {
    match next {
        Transition::Await(state) => format!("await {}", state.path()),
        Transition::Restart(state) => format!("redirect {}", state.path()),
        Transition::Hangup => "hangup".to_owned(),
    }
}
