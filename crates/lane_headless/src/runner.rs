//! Headless session loop.
//!
//! A [`Session`] owns one [`Simulation`] and answers protocol commands.
//! [`run_session`] pumps JSON lines between a reader and a writer, so the
//! same loop serves stdin/stdout and in-memory tests.

use std::io::{self, BufRead, Write};

use lane_core::error::GameError;
use lane_core::factions::Faction;
use lane_core::math::Fixed;
use lane_core::simulation::Simulation;

use crate::protocol::{from_f64, Command, EventOutput, Response, StateOutput};

/// Ticks per simulated second when none is given.
pub const DEFAULT_TICK_RATE: u32 = 4;

/// Headless runner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Ticks per simulated second; sets the default tick length.
    pub tick_rate: u32,
    /// Output state after every `tick` command (vs only on query).
    pub auto_state_output: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            auto_state_output: false,
        }
    }
}

/// Whether the session should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// The controller asked to quit.
    Quit,
}

/// One controlled match.
#[derive(Debug)]
pub struct Session {
    sim: Simulation,
    default_dt: Fixed,
    auto_state_output: bool,
}

impl Session {
    /// Wrap a simulation.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidArgument`] for a zero tick rate.
    pub fn new(sim: Simulation, config: &HeadlessConfig) -> Result<Self, GameError> {
        if config.tick_rate == 0 {
            return Err(GameError::InvalidArgument(
                "tick rate must be positive".to_string(),
            ));
        }
        Ok(Self {
            sim,
            default_dt: Fixed::ONE / Fixed::from_num(config.tick_rate),
            auto_state_output: config.auto_state_output,
        })
    }

    /// The simulation being driven.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Seconds per tick when a `tick` command gives no `dt`.
    #[must_use]
    pub const fn default_dt(&self) -> Fixed {
        self.default_dt
    }

    /// The greeting written before any command is read.
    #[must_use]
    pub fn ready(&self) -> Response {
        Response::ready(self.sim.get_tick(), &self.sim.config().name)
    }

    /// Execute one command and collect the responses it produces.
    pub fn handle(&mut self, cmd: Command) -> (Vec<Response>, Flow) {
        let name = cmd.name();
        tracing::debug!(cmd = name, tick = self.sim.get_tick(), "Processing command");

        let responses = match cmd {
            Command::Tick { count, dt } => self.tick(count, dt),
            Command::Spawn { faction, unit } => vec![self.spawn(&faction, &unit)],
            Command::Restart => vec![match self.sim.restart() {
                Ok(()) => Response::ack(name),
                Err(e) => Response::from_game_error(&e, name),
            }],
            Command::Damage { entity_id, amount } => vec![self.damage(entity_id, amount)],
            Command::Query => vec![Response::State(StateOutput::capture(&self.sim))],
            Command::Hash => vec![Response::StateHash {
                tick: self.sim.get_tick(),
                hash: self.sim.state_hash(),
            }],
            Command::Quit => return (vec![Response::Bye], Flow::Quit),
        };
        (responses, Flow::Continue)
    }

    fn tick(&mut self, count: u32, dt: Option<f64>) -> Vec<Response> {
        let dt = match dt {
            None => self.default_dt,
            Some(raw) => match from_f64(raw) {
                Some(dt) => dt,
                None => {
                    return vec![Response::from_game_error(
                        &GameError::InvalidArgument(format!("dt {raw} is not representable")),
                        "tick",
                    )]
                }
            },
        };

        let mut events = Vec::new();
        let mut outcome = None;
        let mut failure = None;
        for _ in 0..count {
            let step = match self.sim.tick(dt) {
                Ok(step) => step,
                Err(e) => {
                    tracing::warn!(error = %e, tick = self.sim.get_tick(), "Tick rejected");
                    failure = Some(e);
                    break;
                }
            };
            events.extend(
                step.events
                    .iter()
                    .map(|event| EventOutput::from_event(step.tick, event, &self.sim)),
            );
            if let Some(end) = step.match_outcome() {
                outcome = Some((end, step.tick));
            }
        }

        let mut responses = vec![Response::Events {
            tick: self.sim.get_tick(),
            events,
        }];
        if let Some((end, tick)) = outcome {
            tracing::info!(result = end.as_str(), tick, "Game over");
            responses.push(Response::GameOver {
                result: end.as_str().to_string(),
                tick,
            });
        }
        if let Some(e) = failure {
            responses.push(Response::from_game_error(&e, "tick"));
        }
        if self.auto_state_output {
            responses.push(Response::State(StateOutput::capture(&self.sim)));
        }
        responses
    }

    fn spawn(&mut self, faction: &str, unit: &str) -> Response {
        let Some(faction) = Faction::from_short_name(faction) else {
            return Response::from_game_error(
                &GameError::InvalidArgument(format!("unknown faction '{faction}'")),
                "spawn",
            );
        };
        match self.sim.spawn_request_by_key(faction, unit) {
            Ok(result) => Response::from_spawn(result),
            Err(e) => Response::from_game_error(&e, "spawn"),
        }
    }

    fn damage(&mut self, entity_id: u64, amount: f64) -> Response {
        let Some(amount) = from_f64(amount) else {
            return Response::from_game_error(
                &GameError::InvalidArgument(format!("damage {amount} is not representable")),
                "damage",
            );
        };
        match self.sim.apply_damage(entity_id, amount) {
            Ok(_) => Response::ack("damage"),
            Err(e) => Response::from_game_error(&e, "damage"),
        }
    }
}

fn send<W: Write>(writer: &mut W, response: &Response) -> io::Result<()> {
    writeln!(writer, "{}", response.to_json_line())
}

/// Run a session until `quit` or end of input.
///
/// Malformed lines are answered with an `error` response and skipped.
///
/// # Errors
///
/// Only I/O failures on `reader` or `writer` end the session with an error.
pub fn run_session<R: BufRead, W: Write>(
    session: &mut Session,
    reader: R,
    mut writer: W,
) -> io::Result<()> {
    send(&mut writer, &session.ready())?;
    writer.flush()?;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let (responses, flow) = match Command::from_json(&line) {
            Ok(cmd) => session.handle(cmd),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse command");
                (
                    vec![Response::error(format!("Invalid command: {e}"), None)],
                    Flow::Continue,
                )
            }
        };
        for response in &responses {
            send(&mut writer, response)?;
        }
        writer.flush()?;

        if flow == Flow::Quit {
            tracing::info!(tick = session.simulation().get_tick(), "Session ended by quit");
            return Ok(());
        }
    }

    tracing::info!("Input closed, ending session");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_core::config::MatchConfig;

    fn session() -> Session {
        let sim = Simulation::new(MatchConfig::skirmish()).unwrap();
        Session::new(sim, &HeadlessConfig::default()).unwrap()
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let sim = Simulation::new(MatchConfig::skirmish()).unwrap();
        let config = HeadlessConfig {
            tick_rate: 0,
            ..HeadlessConfig::default()
        };
        assert!(Session::new(sim, &config).is_err());
    }

    #[test]
    fn test_default_dt_from_tick_rate() {
        assert_eq!(session().default_dt(), Fixed::from_num(0.25));
    }

    #[test]
    fn test_unknown_faction_is_error_response() {
        let mut session = session();
        let (responses, flow) = session.handle(Command::Spawn {
            faction: "neutral".to_string(),
            unit: "basic_cat".to_string(),
        });
        assert_eq!(flow, Flow::Continue);
        assert!(matches!(
            &responses[0],
            Response::Error { kind: Some(kind), .. } if kind == "invalid_argument"
        ));
    }

    #[test]
    fn test_negative_dt_is_error_response() {
        let mut session = session();
        let (responses, _) = session.handle(Command::Tick {
            count: 1,
            dt: Some(-1.0),
        });
        assert!(matches!(&responses[0], Response::Error { .. }));
        assert_eq!(session.simulation().get_tick(), 0);
    }

    #[test]
    fn test_clock_overflow_keeps_earlier_ticks() {
        let mut session = session();
        let (responses, flow) = session.handle(Command::Tick {
            count: 3,
            dt: Some(2_000_000_000.0),
        });
        assert_eq!(flow, Flow::Continue);
        assert_eq!(responses.len(), 2);
        assert!(matches!(&responses[0], Response::Events { tick: 1, .. }));
        assert!(matches!(
            &responses[1],
            Response::Error { kind: Some(kind), cmd: Some(cmd), .. }
                if kind == "invalid_argument" && cmd == "tick"
        ));
        assert_eq!(session.simulation().get_tick(), 1);
    }

    #[test]
    fn test_restart_while_active_rejected() {
        let mut session = session();
        let (responses, _) = session.handle(Command::Restart);
        assert!(matches!(
            &responses[0],
            Response::Error { kind: Some(kind), .. } if kind == "already_terminal"
        ));
    }

    #[test]
    fn test_quit_says_bye() {
        let mut session = session();
        let (responses, flow) = session.handle(Command::Quit);
        assert_eq!(responses, vec![Response::Bye]);
        assert_eq!(flow, Flow::Quit);
    }
}
