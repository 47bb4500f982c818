use crate::model::Share;
use crate::scheduler::CalendarView;
use anyhow::{bail, Context};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::Path;

/// Import d'andels depuis CSV : header `code,name[,color]`
pub fn import_shares_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Share>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let code = rec.get(0).context("missing code")?.trim();
        let name = rec.get(1).context("missing name")?.trim();
        if code.is_empty() || name.is_empty() {
            bail!("invalid share row (empty)");
        }
        let mut share = Share::new(name, code);
        if let Some(color) = rec.get(2).map(str::trim).filter(|c| !c.is_empty()) {
            share = share.with_color(color);
        }
        out.push(share);
    }
    Ok(out)
}

/// Export CSV d'une année : header `week,starts_on,type,share_code,locked,source,note`
pub fn export_year_csv<P: AsRef<Path>>(path: P, view: &CalendarView) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["week", "starts_on", "type", "share_code", "locked", "source", "note"])?;
    for week in &view.weeks {
        let number = week.week.to_string();
        let starts_on = week.starts_on.to_string();
        match &week.assignment {
            Some(a) => {
                let code = a.share.as_ref().map(|s| s.code.as_str()).unwrap_or("");
                w.write_record([
                    number.as_str(),
                    starts_on.as_str(),
                    a.kind,
                    code,
                    if a.is_locked { "true" } else { "false" },
                    a.source,
                    a.note.as_deref().unwrap_or(""),
                ])?;
            }
            None => {
                w.write_record([number.as_str(), starts_on.as_str(), "", "", "", "", ""])?;
            }
        }
    }
    w.flush()?;
    Ok(())
}

/// Export JSON de la vue calendrier (jolie mise en forme)
pub fn export_calendar_json<P: AsRef<Path>>(path: P, view: &CalendarView) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(view)?;
    fs::write(path, s)?;
    Ok(())
}
