use crate::core::ScheduleError;
use crate::scheduler::PlaybackScheduler;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  start | stop | toggle        start or stop the daily loop
  window <start> <end>         set the window, e.g. window 07:00:00 01:00:00
  start-time <HH:MM:SS>        set the window start
  end-time <HH:MM:SS>          set the window end
  rate <factor>                set the playback rate, e.g. rate 1.5
  file <path>                  set the clip to play
  status                       show the current status
  help                         show this help
  quit | exit                  stop and exit";

/// A line typed at the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    Window { start: String, end: String },
    StartTime(String),
    EndTime(String),
    Rate(f64),
    File(String),
    Status,
    Help,
    Quit,
}

/// Errors parsing a controller line
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a number")]
    NotANumber(String),
}

/// What the controller should do after a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Keep reading; print the text if any
    Continue(Option<String>),
    Quit,
}

impl Command {
    /// Parse one line; words are separated by whitespace
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(CommandError::Empty);
        };
        let args: Vec<&str> = words.collect();

        let command = match (name.to_lowercase().as_str(), args.as_slice()) {
            ("start", []) => Self::Start,
            ("stop", []) => Self::Stop,
            ("toggle", []) => Self::Toggle,
            ("window", [start, end]) => Self::Window {
                start: start.to_string(),
                end: end.to_string(),
            },
            ("window", _) => return Err(CommandError::Usage("window <start> <end>")),
            ("start-time", [time]) => Self::StartTime(time.to_string()),
            ("start-time", _) => return Err(CommandError::Usage("start-time <HH:MM:SS>")),
            ("end-time", [time]) => Self::EndTime(time.to_string()),
            ("end-time", _) => return Err(CommandError::Usage("end-time <HH:MM:SS>")),
            ("rate", [value]) => Self::Rate(
                value
                    .parse()
                    .map_err(|_| CommandError::NotANumber(value.to_string()))?,
            ),
            ("rate", _) => return Err(CommandError::Usage("rate <factor>")),
            // Paths may contain spaces
            ("file", [_, ..]) => Self::File(args.join(" ")),
            ("file", []) => return Err(CommandError::Usage("file <path>")),
            ("status", []) => Self::Status,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            ("start" | "stop" | "toggle" | "status" | "quit" | "exit", _) => {
                return Err(CommandError::Usage("this command takes no arguments"))
            }
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }

    /// Apply the command to the scheduler
    pub async fn execute(self, scheduler: &mut PlaybackScheduler) -> Result<Outcome, ScheduleError> {
        match self {
            Self::Start => scheduler.start()?,
            Self::Stop => scheduler.stop().await,
            Self::Toggle => scheduler.toggle().await?,
            Self::Window { start, end } => scheduler.set_window(&start, &end).await?,
            Self::StartTime(time) => scheduler.set_start_time(&time).await?,
            Self::EndTime(time) => scheduler.set_end_time(&time).await?,
            Self::Rate(rate) => scheduler.set_rate(rate)?,
            Self::File(path) => scheduler.set_clip(&path).await?,
            Self::Status => {
                let text = format!(
                    "{}\n  window {} ({}), clip {}, rate {}",
                    scheduler.status(),
                    scheduler.window(),
                    if scheduler.is_running() { "running" } else { "stopped" },
                    scheduler.clip(),
                    scheduler.rate(),
                );
                return Ok(Outcome::Continue(Some(text)));
            }
            Self::Help => return Ok(Outcome::Continue(Some(HELP.to_string()))),
            Self::Quit => {
                scheduler.stop().await;
                return Ok(Outcome::Quit);
            }
        }
        Ok(Outcome::Continue(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockAudioSink;
    use crate::core::ClockTime;
    use crate::scheduler::SchedulerState;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("start").unwrap(), Command::Start);
        assert_eq!(Command::parse("  STOP  ").unwrap(), Command::Stop);
        assert_eq!(
            Command::parse("window 07:00:00 01:00:00").unwrap(),
            Command::Window {
                start: "07:00:00".to_string(),
                end: "01:00:00".to_string()
            }
        );
        assert_eq!(Command::parse("end-time 23:00").unwrap(), Command::EndTime("23:00".to_string()));
        assert_eq!(Command::parse("rate 1.5").unwrap(), Command::Rate(1.5));
        assert_eq!(
            Command::parse("file My Sounds/step.mp3").unwrap(),
            Command::File("My Sounds/step.mp3".to_string())
        );
        assert_eq!(Command::parse("?").unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert_eq!(Command::parse("play"), Err(CommandError::Unknown("play".to_string())));
        assert_eq!(Command::parse("rate"), Err(CommandError::Usage("rate <factor>")));
        assert_eq!(Command::parse("rate fast"), Err(CommandError::NotANumber("fast".to_string())));
        assert!(matches!(Command::parse("window 07:00"), Err(CommandError::Usage(_))));
        assert!(matches!(Command::parse("start now"), Err(CommandError::Usage(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_against_scheduler() {
        let mut scheduler = PlaybackScheduler::new(Box::new(MockAudioSink::new("mock")));

        let outcome = Command::parse("start-time 06:30").unwrap().execute(&mut scheduler).await.unwrap();
        assert_eq!(outcome, Outcome::Continue(None));
        assert_eq!(scheduler.window().start, ClockTime::from_hms(6, 30, 0).unwrap());

        let err = Command::Rate(0.0).execute(&mut scheduler).await.unwrap_err();
        assert_eq!(err, ScheduleError::InvalidRate(0.0));

        Command::Toggle.execute(&mut scheduler).await.unwrap();
        assert!(scheduler.is_running());

        match Command::Status.execute(&mut scheduler).await.unwrap() {
            Outcome::Continue(Some(text)) => assert!(text.contains("running"), "{}", text),
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(Command::Quit.execute(&mut scheduler).await.unwrap(), Outcome::Quit);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.status().state, SchedulerState::Idle);
    }
}
