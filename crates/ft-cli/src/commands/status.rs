//! Status command for showing what was loaded.

use std::io::Write;

use anyhow::Result;

use ft_core::Tracker;

use super::{History, write_unreadable};
use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    tracker: &Tracker,
    history: &History,
) -> Result<()> {
    writeln!(writer, "Focus tracker status")?;
    writeln!(writer, "Data directory: {}", config.data_dir.display())?;
    writeln!(writer, "Preferences: {}", config.preferences_file().display())?;
    writeln!(writer, "Days loaded: {}", history.days)?;
    writeln!(writer, "Records: {}", tracker.record_count())?;

    let days = tracker.days();
    if let (Some(first), Some(last)) = (days.first(), days.last()) {
        writeln!(writer, "Range: {first} to {last}")?;
    }

    write_unreadable(writer, history)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    use crate::commands::{load_history, open_tracker};

    #[test]
    fn status_command_outputs_counts_and_errors() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("20240102.csv"),
            "identifier,timestamp,tabName,tabUrl,hadActivity\n\
             code.exe,2024-01-02T09:00:00Z,,,true\n\
             code.exe,2024-01-02T09:00:10Z,,,true\n\
             chrome.exe,2024-01-02T09:00:20Z,Docs,https://docs.rs/x,true\n\
             chrome.exe,2024-01-02T09:00:30Z,Docs,https://docs.rs/y,true\n",
        )
        .unwrap();
        std::fs::create_dir(temp.path().join("20240103.csv")).unwrap();

        let config = Config {
            data_dir: temp.path().to_path_buf(),
            history_start: 20_240_101,
            ..Config::default()
        };
        let tracker = open_tracker(&config).unwrap();
        let history = load_history(&tracker, &config, 20_240_105);

        let mut output = Vec::new();
        run(&mut output, &config, &tracker, &history).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&temp.path().display().to_string(), "[TEMP]");
        assert_snapshot!(output, @r"
        Focus tracker status
        Data directory: [TEMP]
        Preferences: [TEMP]/preferences.json
        Days loaded: 1
        Records: 2
        Range: 20240102 to 20240102
        Unreadable day logs:
        - 20240103: failed to read day log [TEMP]/20240103.csv
        ");
    }
}
