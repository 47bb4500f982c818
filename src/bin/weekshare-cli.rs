#![forbid(unsafe_code)]
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use weekshare::{
    io,
    model::{CalendarEvent, Share, ShareId, SwapId, WeekKind},
    scheduler::{SwapProposal, WeekPatch},
    service::WeekService,
    storage::JsonStorage,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de répartition des semaines entre andels
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du ledger
    #[arg(long, global = true, default_value = "weekshare.json")]
    store: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Créer les andels FK, HT, OT, KP, AF et la séquence par défaut
    Init,

    /// Ajouter un andel
    AddShare {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        color: Option<String>,
    },

    /// Renommer un andel (code ou id)
    RenameShare {
        #[arg(long)]
        share: String,
        #[arg(long)]
        name: String,
    },

    /// Importer des andels depuis un CSV `code,name[,color]`
    ImportShares {
        #[arg(long)]
        csv: String,
    },

    /// Lister les andels
    Shares,

    /// Afficher ou remplacer la séquence de rotation
    Sequence {
        /// liste "FK,HT,..." (codes ou ids)
        #[arg(long, conflicts_with = "clear")]
        set: Option<String>,
        /// Vider la séquence
        #[arg(long)]
        clear: bool,
    },

    /// Générer les semaines d'une année
    Generate {
        #[arg(long)]
        year: i32,
        /// Position de départ dans la séquence (sinon réglage enregistré)
        #[arg(long)]
        anchor: Option<usize>,
    },

    /// Modifier manuellement une semaine
    PatchWeek {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        week: u32,
        /// share | common | opening | closing | blocked
        #[arg(long = "type")]
        kind: String,
        /// Andel (obligatoire pour `share`)
        #[arg(long)]
        share: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Afficher le calendrier d'une année et optionnellement l'exporter
    Calendar {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Proposer un échange de semaines
    Propose {
        /// Andel demandeur
        #[arg(long = "as")]
        acting: String,
        /// Andel receveur
        #[arg(long)]
        with: String,
        #[arg(long)]
        year: i32,
        /// Semaine cédée
        #[arg(long)]
        give: u32,
        /// Semaine souhaitée
        #[arg(long)]
        want: u32,
        #[arg(long)]
        message: Option<String>,
    },

    /// Accepter un échange (andel receveur)
    Accept {
        #[arg(long)]
        swap_id: String,
        #[arg(long = "as")]
        acting: String,
    },

    /// Refuser un échange (andel receveur)
    Reject {
        #[arg(long)]
        swap_id: String,
        #[arg(long = "as")]
        acting: String,
    },

    /// Écrire dans la discussion d'un échange
    Message {
        #[arg(long)]
        swap_id: String,
        #[arg(long = "as")]
        acting: String,
        #[arg(long)]
        text: String,
    },

    /// Lister les échanges
    Swaps {
        #[arg(long)]
        share: Option<String>,
    },

    /// Ajouter un événement (dates YYYY-MM-DD ou RFC3339 UTC)
    AddEvent {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "event")]
        kind: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        timed: bool,
        #[arg(long)]
        description: Option<String>,
    },

    /// Supprimer un événement
    RemoveEvent {
        #[arg(long)]
        id: String,
    },

    /// Afficher ou modifier les réglages
    Settings {
        #[arg(long)]
        anchor: Option<usize>,
        #[arg(long)]
        ics_weeks: Option<bool>,
        #[arg(long)]
        ics_holidays: Option<bool>,
    },

    /// Exporter une année au format ICS
    ExportIcs {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        out: String,
    },

    /// Exporter une année en CSV
    ExportCsv {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        out: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let service = WeekService::new(JsonStorage::open(&cli.store)?);

    let code = match cli.cmd {
        Commands::Init => {
            if service.seed_default_shares()? {
                println!("Created default shares and sequence");
            } else {
                println!("Sequence already defined, nothing to do");
            }
            0
        }
        Commands::AddShare { code, name, color } => {
            let mut share = Share::new(name, code);
            if let Some(color) = color {
                share = share.with_color(color);
            }
            let id = service.add_share(share)?;
            println!("{}", id.as_str());
            0
        }
        Commands::RenameShare { share, name } => {
            let id = resolve_share(&service, &share)?;
            service.rename_share(&id, &name)?;
            0
        }
        Commands::ImportShares { csv } => {
            let shares = io::import_shares_csv(csv)?;
            let count = shares.len();
            for share in shares {
                service.add_share(share)?;
            }
            println!("Imported {count} share(s)");
            0
        }
        Commands::Shares => {
            for s in service.list_shares()? {
                println!(
                    "{} | {} | {} | {}",
                    s.id.as_str(),
                    s.code,
                    s.name,
                    s.color.as_deref().unwrap_or("-")
                );
            }
            0
        }
        Commands::Sequence { set, clear } => {
            if clear {
                service.replace_sequence(&[])?;
            } else if let Some(list) = set {
                let mut ids = Vec::new();
                for key in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    ids.push(resolve_share(&service, key)?);
                }
                service.replace_sequence(&ids)?;
            }
            for (position, s) in service.sequence()?.iter().enumerate() {
                println!("{position}: {} ({})", s.code, s.name);
            }
            0
        }
        Commands::Generate { year, anchor } => {
            let report = service.generate_year(year, anchor)?;
            println!(
                "Successfully generated {} weeks for {} (ascension week {})",
                report.generated_weeks, report.year, report.ascension_week
            );
            0
        }
        Commands::PatchWeek {
            year,
            week,
            kind,
            share,
            note,
        } => {
            let kind = parse_kind(&service, &kind, share.as_deref())?;
            let record = service.patch_week(WeekPatch {
                year,
                week,
                kind,
                note,
            })?;
            println!(
                "Week {} of {} set to {} (MANUAL)",
                record.week,
                record.year,
                record.kind.type_name()
            );
            0
        }
        Commands::Calendar {
            year,
            out_json,
            out_csv,
        } => {
            let view = service.calendar(year)?;
            if let Some(path) = out_json {
                io::export_calendar_json(path, &view)?;
            }
            if let Some(path) = out_csv {
                io::export_year_csv(path, &view)?;
            }
            let mut missing = 0usize;
            for w in &view.weeks {
                match &w.assignment {
                    Some(a) => {
                        let who = a
                            .share
                            .as_ref()
                            .map(|s| s.code.as_str())
                            .unwrap_or(a.kind);
                        println!(
                            "{:>2} | {} | {:<6} | {:<9} | {}{}",
                            w.week,
                            w.starts_on,
                            who,
                            a.source,
                            if a.is_locked { "locked" } else { "-" },
                            a.note
                                .as_deref()
                                .map(|n| format!(" | {n}"))
                                .unwrap_or_default()
                        );
                    }
                    None => {
                        missing += 1;
                        println!("{:>2} | {} | -", w.week, w.starts_on);
                    }
                }
            }
            println!("Ascension week: {}", view.ascension_week);
            // Code 2 = année incomplète
            if missing > 0 {
                eprintln!("{missing} week(s) without assignment");
                2
            } else {
                0
            }
        }
        Commands::Propose {
            acting,
            with,
            year,
            give,
            want,
            message,
        } => {
            let requesting = resolve_share(&service, &acting)?;
            let receiving = resolve_share(&service, &with)?;
            let swap = service.propose_swap(
                &requesting,
                SwapProposal {
                    requesting: requesting.clone(),
                    receiving,
                    year,
                    week_a: give,
                    week_b: want,
                    message,
                },
                Utc::now(),
            )?;
            println!("{}", swap.id.as_str());
            0
        }
        Commands::Accept { swap_id, acting } => {
            let actor = resolve_share(&service, &acting)?;
            let swap = service.accept_swap(&SwapId::new(swap_id), &actor, Utc::now())?;
            println!(
                "Swap accepted: weeks {} and {} of {} are now locked",
                swap.week_a, swap.week_b, swap.year
            );
            0
        }
        Commands::Reject { swap_id, acting } => {
            let actor = resolve_share(&service, &acting)?;
            service.reject_swap(&SwapId::new(swap_id), &actor, Utc::now())?;
            println!("Swap rejected");
            0
        }
        Commands::Message {
            swap_id,
            acting,
            text,
        } => {
            let actor = resolve_share(&service, &acting)?;
            service.post_swap_message(&SwapId::new(swap_id), &actor, &text, Utc::now())?;
            0
        }
        Commands::Swaps { share } => {
            let filter = share
                .as_deref()
                .map(|key| resolve_share(&service, key))
                .transpose()?;
            let ledger = service.snapshot()?;
            let label = |id: &ShareId| {
                ledger
                    .find_share(id)
                    .map(|s| s.code.clone())
                    .unwrap_or_else(|| id.as_str().to_string())
            };
            for s in service.list_swaps(filter.as_ref())? {
                println!(
                    "{} | {} | {} uge {} ⇄ {} uge {} | {}",
                    s.id.as_str(),
                    s.year,
                    label(&s.requesting_share_id),
                    s.week_a,
                    label(&s.receiving_share_id),
                    s.week_b,
                    s.status.as_str()
                );
            }
            0
        }
        Commands::AddEvent {
            title,
            kind,
            start,
            end,
            timed,
            description,
        } => {
            let start = parse_point(&start)?;
            let end = parse_point(&end)?;
            let mut event = CalendarEvent::new(title, kind, start, end, !timed, Utc::now())
                .map_err(anyhow::Error::msg)?;
            event.description = description;
            let id = service.add_event(event)?;
            println!("{id}");
            0
        }
        Commands::RemoveEvent { id } => {
            service.remove_event(&id)?;
            0
        }
        Commands::Settings {
            anchor,
            ics_weeks,
            ics_holidays,
        } => {
            let mut settings = service.settings()?;
            if anchor.is_some() || ics_weeks.is_some() || ics_holidays.is_some() {
                if let Some(anchor) = anchor {
                    settings.anchor_share_index = anchor;
                }
                if let Some(flag) = ics_weeks {
                    settings.include_week_assignments_in_ics = flag;
                }
                if let Some(flag) = ics_holidays {
                    settings.include_holidays_in_ics = flag;
                }
                service.update_settings(settings.clone())?;
            }
            println!("anchor_share_index = {}", settings.anchor_share_index);
            println!(
                "include_week_assignments_in_ics = {}",
                settings.include_week_assignments_in_ics
            );
            println!("include_holidays_in_ics = {}", settings.include_holidays_in_ics);
            0
        }
        Commands::ExportIcs { year, out } => {
            let ics = service.export_ics(year, Utc::now())?;
            std::fs::write(&out, ics)?;
            println!("Calendar for {year} written to {out}");
            0
        }
        Commands::ExportCsv { year, out } => {
            let view = service.calendar(year)?;
            io::export_year_csv(&out, &view)?;
            println!("{} weeks of {year} written to {out}", view.weeks_in_year);
            0
        }
    };

    std::process::exit(code);
}

/// Résout un andel par code (insensible à la casse) ou par id.
fn resolve_share(service: &WeekService<JsonStorage>, key: &str) -> Result<ShareId> {
    let ledger = service.snapshot()?;
    ledger
        .find_share_by_code(key)
        .or_else(|| ledger.find_share(&ShareId::new(key)))
        .map(|s| s.id.clone())
        .ok_or_else(|| anyhow!("unknown share: {key}"))
}

fn parse_kind(
    service: &WeekService<JsonStorage>,
    raw: &str,
    share: Option<&str>,
) -> Result<WeekKind> {
    let kind = match raw.to_ascii_lowercase().as_str() {
        "share" => {
            let Some(key) = share else {
                bail!("--share is required when type is share");
            };
            WeekKind::Share {
                share_id: resolve_share(service, key)?,
            }
        }
        "common" => WeekKind::Common,
        "opening" => WeekKind::Opening,
        "closing" => WeekKind::Closing,
        "blocked" => WeekKind::Blocked,
        other => bail!("unknown week type: {other}"),
    };
    Ok(kind)
}

fn parse_point(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid date/datetime {raw}: {e}"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid midnight conversion"))?;
    Ok(Utc.from_utc_datetime(&midnight))
}
