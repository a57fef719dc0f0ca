//! Rendering for `list`, `status` and `export`.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::bail;
use serde::Serialize;

use crate::cloud::{abbreviate_id, IdentityDetails};
use crate::store::{Context, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
    Yaml,
    Plain,
}

impl Format {
    /// `None` or empty selects the human-readable form.
    pub fn parse(s: Option<&str>) -> anyhow::Result<Self> {
        let raw = s.unwrap_or_default();
        Ok(match raw.to_lowercase().as_str() {
            "" => Format::Human,
            "json" => Format::Json,
            "yaml" | "yml" => Format::Yaml,
            "plain" => Format::Plain,
            _ => bail!("unsupported output format: {raw}"),
        })
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_yaml<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    out.write_all(serde_yaml::to_string(value)?.as_bytes())?;
    Ok(())
}

/// One line per context, `*` marking the current one.
pub fn contexts<W: Write>(out: &mut W, doc: &Document, format: Format, verbose: bool) -> anyhow::Result<()> {
    match format {
        Format::Human => {
            for ctx in &doc.contexts {
                let marker = if ctx.name == doc.current_context { "*" } else { " " };
                if verbose {
                    writeln!(
                        out,
                        "{marker} {} (profile={} region={} tenancy={} compartment={} user={})",
                        ctx.name, ctx.profile, ctx.region, ctx.tenancy_id, ctx.compartment_id, ctx.user
                    )?;
                } else {
                    writeln!(out, "{marker} {} (profile={} region={})", ctx.name, ctx.profile, ctx.region)?;
                }
            }
            Ok(())
        }
        Format::Json => write_json(out, &doc.contexts),
        Format::Yaml => write_yaml(out, &doc.contexts),
        Format::Plain => {
            for ctx in &doc.contexts {
                let marker = if ctx.name == doc.current_context { "*" } else { "" };
                writeln!(
                    out,
                    "context={}{marker} profile={} region={} tenancy={} compartment={} user={} notes={}",
                    ctx.name,
                    ctx.profile,
                    ctx.region,
                    ctx.tenancy_id,
                    ctx.compartment_id,
                    ctx.user,
                    ctx.notes
                )?;
            }
            Ok(())
        }
    }
}

/// Status fields keyed the way the structured formats print them.
fn status_fields(ctx: &Context, details: &IdentityDetails) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("context", ctx.name.clone()),
        ("profile", ctx.profile.clone()),
        ("tenancy", details.tenancy_name.clone()),
        ("tenancy_id", details.tenancy_id.clone()),
        ("compartment", details.compartment_name.clone()),
        ("compartment_id", details.compartment_id.clone()),
        ("user", details.user_name.clone()),
        ("user_id", details.user_id.clone()),
        ("region", details.region.clone()),
    ])
}

/// The current context with friendly names. `ids_only` prints bare OCIDs on one line.
pub fn status<W: Write>(
    out: &mut W,
    ctx: &Context,
    details: &IdentityDetails,
    format: Format,
    ids_only: bool,
) -> anyhow::Result<()> {
    let d = details;
    if ids_only {
        writeln!(
            out,
            "context={} profile={} tenancy={} compartment={} user={} region={}",
            ctx.name, ctx.profile, d.tenancy_id, d.compartment_id, d.user_id, d.region
        )?;
        return Ok(());
    }
    let show_profile = ctx.name != ctx.profile;
    match format {
        Format::Human => {
            writeln!(out, "context: {}", ctx.name)?;
            if show_profile {
                writeln!(out, "profile: {}", ctx.profile)?;
            }
            writeln!(out, "tenancy: {} ({})", d.tenancy_name, d.tenancy_id)?;
            writeln!(out, "compartment: {} ({})", d.compartment_name, d.compartment_id)?;
            writeln!(out, "user: {} ({})", d.user_name, d.user_id)?;
            writeln!(out, "region: {}", d.region)?;
            Ok(())
        }
        Format::Json => write_json(out, &status_fields(ctx, d)),
        Format::Yaml => write_yaml(out, &status_fields(ctx, d)),
        Format::Plain => {
            let profile = if show_profile {
                format!(" profile={}", ctx.profile)
            } else {
                String::new()
            };
            writeln!(
                out,
                "context={}{profile} tenancy={} ({}) compartment={} ({}) user={} ({}) region={}",
                ctx.name,
                d.tenancy_name,
                abbreviate_id(&d.tenancy_id),
                d.compartment_name,
                abbreviate_id(&d.compartment_id),
                d.user_name,
                abbreviate_id(&d.user_id),
                d.region
            )?;
            Ok(())
        }
    }
}

/// `export KEY=value` lines, or the context as JSON.
pub fn export<W: Write>(out: &mut W, ctx: &Context, format: &str) -> anyhow::Result<()> {
    match format {
        "env" | "" => {
            for line in ctx.env_lines() {
                writeln!(out, "export {line}")?;
            }
            Ok(())
        }
        "json" => write_json(out, ctx),
        other => bail!("unsupported format: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        let mut doc = Document::default();
        for (name, region) in [("dev", "us-ashburn-1"), ("prod", "eu-frankfurt-1")] {
            doc.upsert(Context {
                name: name.into(),
                profile: "DEFAULT".into(),
                tenancy_id: "ocid1.tenancy.oc1..aaaa".into(),
                compartment_id: "ocid1.compartment.oc1..bbbb".into(),
                region: region.into(),
                user: "alice".into(),
                notes: "n".into(),
            });
        }
        doc
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn format_parsing() {
        assert_eq!(Format::parse(None).unwrap(), Format::Human);
        assert_eq!(Format::parse(Some("YML")).unwrap(), Format::Yaml);
        let err = Format::parse(Some("xml")).unwrap_err();
        assert_eq!(err.to_string(), "unsupported output format: xml");
    }

    #[test]
    fn human_list_marks_current() {
        let text = render(|out| contexts(out, &doc(), Format::Human, false));
        assert_eq!(
            text,
            "* dev (profile=DEFAULT region=us-ashburn-1)\n  prod (profile=DEFAULT region=eu-frankfurt-1)\n"
        );
        let verbose = render(|out| contexts(out, &doc(), Format::Human, true));
        assert!(verbose.contains("user=alice)"));
    }

    #[test]
    fn plain_list_has_every_field() {
        let text = render(|out| contexts(out, &doc(), Format::Plain, false));
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("context=dev* profile=DEFAULT"));
        assert!(first.ends_with("user=alice notes=n"));
    }

    #[test]
    fn json_list_uses_document_keys() {
        let text = render(|out| contexts(out, &doc(), Format::Json, false));
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v[1]["name"], "prod");
        assert_eq!(v[1]["compartment_ocid"], "ocid1.compartment.oc1..bbbb");
    }

    #[test]
    fn status_forms() {
        let doc = doc();
        let ctx = doc.current().unwrap();
        let details = IdentityDetails {
            tenancy_name: "acme".into(),
            tenancy_id: "ocid1.tenancy.oc1..aaaaaaaaaaaaxyz123".into(),
            compartment_name: "apps".into(),
            compartment_id: "c1".into(),
            user_name: "alice".into(),
            user_id: "u1".into(),
            region: "us-ashburn-1".into(),
        };

        let human = render(|out| status(out, ctx, &details, Format::Human, false));
        assert!(human.starts_with("context: dev\nprofile: DEFAULT\ntenancy: acme (ocid1.tenancy"));

        let plain = render(|out| status(out, ctx, &details, Format::Plain, false));
        assert_eq!(
            plain,
            "context=dev profile=DEFAULT tenancy=acme (ocid1.\u{2026}xyz123) compartment=apps (c1) user=alice (u1) region=us-ashburn-1\n"
        );

        let ids = render(|out| status(out, ctx, &details, Format::Json, true));
        assert!(ids.starts_with("context=dev profile=DEFAULT tenancy=ocid1.tenancy"));

        let json = render(|out| status(out, ctx, &details, Format::Json, false));
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["compartment"], "apps");
    }

    #[test]
    fn export_env_and_json() {
        let doc = doc();
        let ctx = doc.current().unwrap();
        let env = render(|out| export(out, ctx, "env"));
        assert_eq!(env.lines().next().unwrap(), "export OCI_CLI_PROFILE=DEFAULT");
        assert_eq!(env.lines().last().unwrap(), "export OCI_REGION=us-ashburn-1");
        let json = render(|out| export(out, ctx, "json"));
        assert!(json.contains("\"tenancy_ocid\""));
        let mut sink = Vec::new();
        let err = export(&mut sink, ctx, "toml").unwrap_err();
        assert_eq!(err.to_string(), "unsupported format: toml");
    }
}
