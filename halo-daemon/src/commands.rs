use anyhow::{anyhow, bail, Context, Result};
use halo_core::config::parse_light_ids;
use halo_core::ConfigUpdate;
use std::time::Duration;

pub const HELP: &str = "\
Commands:
  start                 start syncing lights to playback
  stop                  stop syncing (lights keep their colors)
  status                print the sync status as JSON
  lights                list the bridge's lights
  groups                list the bridge's rooms and zones
  test                  check both services are reachable
  once                  sync the current track a single time
  set <key> <value>     change a setting: lights, colors, interval,
                        backoff, brightness, min-brightness,
                        max-brightness, transition, boost (or 'off')
  help                  show this text
  quit                  stop and exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Status,
    Lights,
    Groups,
    Test,
    Once,
    Set(ConfigUpdate),
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "status" => Command::Status,
        "lights" => Command::Lights,
        "groups" => Command::Groups,
        "test" => Command::Test,
        "once" => Command::Once,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "set" => {
            let key = words.next().ok_or_else(|| anyhow!("usage: set <key> <value>"))?;
            let value = words.collect::<Vec<_>>().join(" ");
            if value.is_empty() {
                bail!("missing value for '{}'", key);
            }
            Command::Set(parse_setting(key, &value)?)
        }
        other => bail!("unknown command '{}', try 'help'", other),
    };
    Ok(Some(command))
}

fn parse_setting(key: &str, value: &str) -> Result<ConfigUpdate> {
    let mut update = ConfigUpdate::default();
    match key {
        "lights" => update.light_ids = Some(parse_light_ids(value)?),
        "colors" => update.num_colors = Some(number(key, value)?),
        "interval" => update.poll_interval = Some(seconds(key, value)?),
        "backoff" => update.backoff_interval = Some(seconds(key, value)?),
        "brightness" => update.brightness = Some(number(key, value)?),
        "min-brightness" => update.min_brightness = Some(number(key, value)?),
        "max-brightness" => update.max_brightness = Some(number(key, value)?),
        "transition" => update.transition_time = Some(number(key, value)?),
        "boost" => {
            update.saturation_boost = Some(match value {
                "off" | "none" => None,
                _ => Some(number(key, value)?),
            })
        }
        other => bail!("unknown setting '{}'", other),
    }
    Ok(update)
}

fn number<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid value '{}' for {}", value, key))
}

fn seconds(key: &str, value: &str) -> Result<Duration> {
    let secs: f64 = number(key, value)?;
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("invalid duration '{}' for {}", value, key))
}
