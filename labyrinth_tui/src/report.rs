//! Plain-text end-of-run report.

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use labyrinth_core::{ItemKind, Position, environment::RunReport};

const RULE: &str = "----------------------------------------------------";
/// Trajectory cells printed per line.
const CELLS_PER_LINE: usize = 8;

fn round_or_never(round: Option<u32>) -> String {
    round.map_or_else(|| "never".to_string(), |r| format!("round {r}"))
}

fn item_or_none(item: Option<ItemKind>) -> String {
    item.map_or_else(|| "none".to_string(), |kind| kind.to_string())
}

fn join(cells: &[Position]) -> String {
    cells
        .iter()
        .map(Position::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text layout of a [`RunReport`].
struct ReportText<'a>(&'a RunReport);

impl fmt::Display for ReportText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "================ LABYRINTH RUN REPORT ================")?;
        writeln!(f, "FINAL STATUS: {}", report.status)?;
        writeln!(f, "Final round: {}", report.final_round)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Remaining energy: {} steps", report.remaining_energy)?;
        match &report.equipment {
            Some(equipment) => {
                writeln!(f, "Weapon: {}", item_or_none(equipment.weapon))?;
                writeln!(f, "Armor: {}", item_or_none(equipment.armor))?;
            }
            None => writeln!(f, "[INFO] Item collection and tracking were disabled.")?,
        }
        writeln!(f, "{RULE}")?;

        writeln!(f, "EXPLORER TRAJECTORY ({} cells):", report.trajectory.len())?;
        let lines: Vec<String> = report.trajectory.chunks(CELLS_PER_LINE).map(join).collect();
        writeln!(f, "-> [{}]", lines.join(",\n   "))?;
        writeln!(f, "{RULE}")?;

        writeln!(f, "GUARDIAN TRACKING:")?;
        writeln!(f, " - Detection: {}", round_or_never(report.detected_at))?;
        writeln!(f, " - Encounter: {}", round_or_never(report.encountered_at))?;
        if report.chase_path.is_empty() {
            writeln!(f, " - No chase was recorded.")?;
        } else {
            writeln!(f, " - Chase path: [{}]", join(&report.chase_path))?;
        }
        writeln!(f, "======================================================")
    }
}

/// Formats `report` as the human-readable text written at the end of a run.
pub fn render(report: &RunReport) -> String {
    ReportText(report).to_string()
}

/// Writes the rendered report to `path`.
pub fn write(path: &Path, report: &RunReport) -> Result<()> {
    fs::write(path, render(report))
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
