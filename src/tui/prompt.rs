//! Line-oriented picker for when stdout is not a terminal.
//!
//! Pick a profile by number, then walk compartments one level at a time.
//! `0` keeps the current compartment.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context as _};

use crate::cloud::{with_timeout, CloudApi, FETCH_TIMEOUT};
use crate::profiles::Profiles;
use crate::store::{self, Document};

use super::rows::{contexts_from_profiles, Row};

/// Run the prompt flow and save the chosen context as current.
pub async fn run_prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    cloud: &dyn CloudApi,
    path: &Path,
    mut doc: Document,
    profiles: &Profiles,
) -> anyhow::Result<()> {
    let auth = doc.options.auth_config_path.clone();
    let contexts: Vec<_> = contexts_from_profiles(profiles)
        .into_iter()
        .filter_map(|r| match r {
            Row::Context(c) => Some(c),
            _ => None,
        })
        .collect();
    if contexts.is_empty() {
        bail!("no profiles available from {auth}");
    }

    writeln!(out, "Select profile:")?;
    for (i, c) in contexts.iter().enumerate() {
        writeln!(
            out,
            "{}) {} (tenancy={} region={})",
            i + 1,
            c.name,
            c.tenancy_id,
            c.region
        )?;
    }
    let Some(idx) = read_choice(input, contexts.len(), false)? else {
        bail!("invalid choice");
    };
    let mut ctx = contexts[idx].clone();

    let mut parent = ctx.start_compartment().to_string();
    loop {
        writeln!(out, "Listing compartments under {parent}...")?;
        let children = with_timeout(
            "list compartments",
            FETCH_TIMEOUT,
            cloud.fetch_compartments(&auth, &ctx.profile, &ctx.region, &parent),
        )
        .await?;
        if children.is_empty() {
            writeln!(out, "No child compartments; keeping current selection.")?;
            break;
        }
        writeln!(out, "Select compartment (or 0 to keep current):")?;
        writeln!(out, "0) stay at {parent}")?;
        for (i, c) in children.iter().enumerate() {
            writeln!(out, "{}) {}", i + 1, Row::Compartment(c.clone()).title())?;
        }
        match read_choice(input, children.len(), true)? {
            Some(i) => parent = children[i].id.clone(),
            None => break,
        }
    }

    ctx.compartment_id = parent.clone();
    doc.current_context = ctx.name.clone();
    let name = ctx.name.clone();
    doc.upsert(ctx);
    store::save(path, &doc).with_context(|| format!("saving {}", path.display()))?;
    writeln!(out, "Selected context {name} with compartment {parent}")?;
    Ok(())
}

/// Read a 1-based choice. With `allow_zero`, `0` yields `None`.
fn read_choice<R: BufRead>(input: &mut R, n: usize, allow_zero: bool) -> anyhow::Result<Option<usize>> {
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            bail!("unexpected end of input");
        }
        if !line.trim().is_empty() {
            break;
        }
    }
    let choice: usize = line.trim().parse().context("invalid choice")?;
    if choice == 0 && allow_zero {
        return Ok(None);
    }
    if choice < 1 || choice > n {
        bail!("invalid choice");
    }
    Ok(Some(choice - 1))
}
