//! Startup banner.

use std::io::{self, Write};
use std::sync::Arc;

use crate::config::{AppSettings, BannerMode};
use crate::env::Environment;

/// Writes a banner.
pub trait Banner: Send + Sync {
    fn print(&self, environment: &Environment, main_name: Option<&str>, out: &mut dyn Write) -> io::Result<()>;
}

/// The banner used when none is configured.
#[derive(Debug, Default)]
pub struct DefaultBanner;

const ART: &[&str] = &[
    r"  _ _  __ _        __  __ ",
    r" | (_)/ _| |_ ___ / _|/ _|",
    r" | | |  _|  _/ _ \  _|  _|",
    r" |_|_|_|  \__\___/_| |_|  ",
];

impl Banner for DefaultBanner {
    fn print(&self, _: &Environment, _: Option<&str>, out: &mut dyn Write) -> io::Result<()> {
        for line in ART {
            writeln!(out, "{line}")?;
        }
        writeln!(out, " :: liftoff ::  (v{})", env!("CARGO_PKG_VERSION"))?;
        writeln!(out)
    }
}

/// Print the banner per `banner-mode`.
///
/// Returns the banner that was printed, or `None` when the mode is `Off`.
/// A write failure is logged; it never fails the run.
pub fn print_banner(settings: &AppSettings, environment: &Environment) -> Option<Arc<dyn Banner>> {
    if settings.main.banner_mode == BannerMode::Off {
        return None;
    }
    let banner = settings
        .banner
        .clone()
        .unwrap_or_else(|| Arc::new(DefaultBanner) as Arc<dyn Banner>);
    let main_name = settings.main_name.as_deref();

    let written = match settings.main.banner_mode {
        BannerMode::Log => {
            let mut rendered = Vec::new();
            banner.print(environment, main_name, &mut rendered).map(|()| {
                tracing::info!("\n{}", String::from_utf8_lossy(&rendered));
            })
        }
        _ => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            banner.print(environment, main_name, &mut out)
        }
    };
    if let Err(err) = written {
        tracing::warn!(error = %err, "Unable to print banner");
    }
    Some(banner)
}
