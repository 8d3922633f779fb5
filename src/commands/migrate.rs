// ABOUTME: Migrate command copying legacy term meta into core term meta
// ABOUTME: Best-effort per term and per key, with optional destructive cleanup

use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::carriers::{CarrierIndex, ResolvedTerm};
use crate::platform::{MetaAddOutcome, Platform};
use crate::preflight;
use crate::utils::elide_long_value;

/// Flags for the migrate command. All independent and combinable.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrateOptions {
    /// Delete legacy meta after migrating it, and each emptied carrier
    /// post. Irreversible.
    pub destructive: bool,
    /// Perform every read and print every pending operation, but issue
    /// no writes or deletes.
    pub dry_run: bool,
    /// Emit a line per term, per key, and per value operation.
    pub verbose: bool,
    /// Skip the interactive confirmation for destructive runs.
    pub yes: bool,
}

/// Migrate all legacy Fieldmanager term meta to core term meta.
pub async fn migrate<P: Platform>(db: &P, opts: &MigrateOptions) -> Result<()> {
    println!("Starting term meta migration");

    if opts.dry_run {
        tracing::warn!("THIS IS A DRY RUN");
    } else if opts.destructive {
        tracing::warn!(
            "With the --destructive flag set, this will delete all Fieldmanager term meta \
             after it is successfully migrated. There is no undo for this."
        );
        if !opts.yes {
            let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Do you want to continue?")
                .default(false)
                .interact()?;
            if !confirmed {
                bail!("Migration aborted; no changes were made");
            }
        }
    }

    preflight::ensure_term_meta_ready(db).await?;

    let mut index = CarrierIndex::new();
    let terms = index.resolve_terms(db).await?;
    tracing::debug!("Resolved {} terms with legacy meta", terms.len());

    for resolved in &terms {
        migrate_term(db, resolved, opts).await;
    }

    println!("Process complete!");

    if !opts.dry_run {
        println!();
        println!(
            "You're almost done! To use the new term meta, you need to update Fieldmanager, \
             then update your code accordingly:"
        );
        println!(
            "- Replace any call to Fieldmanager_Field::add_term_form() with \
             Fieldmanager_Field::add_term_meta_box()."
        );
        println!(
            "- You need to update the arguments anywhere you're instantiating \
             Fieldmanager_Context_Term directly."
        );
        println!(
            "See https://github.com/alleyinteractive/wordpress-fieldmanager/issues/400 \
             for details."
        );
        println!("Happy coding!");
        println!();
    }

    Ok(())
}

/// Migrate one term. Never fails the run; every recoverable problem is
/// logged and the remaining keys and terms continue.
async fn migrate_term<P: Platform>(db: &P, resolved: &ResolvedTerm, opts: &MigrateOptions) {
    let term = &resolved.term;

    if opts.verbose {
        println!(
            "Processing {} `{}' ({}, {})",
            term.taxonomy, term.name, term.slug, term.term_id
        );
    }

    let term_meta = match db.legacy_term_meta(term.term_id, &term.taxonomy).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!(
                "Failed to fetch Fieldmanager term meta for term {}: {:#}",
                term.term_id,
                e
            );
            return;
        }
    };

    if opts.verbose {
        let total: usize = term_meta.iter().map(|(_, values)| values.len()).sum();
        println!("\tFound {} meta entries", total);
    }

    // True while every key so far has had all values added and, under
    // --destructive, its legacy rows deleted.
    let mut legacy_meta_cleared = true;

    for (meta_key, meta_values) in &term_meta {
        if opts.verbose {
            println!(
                "\tMigrating {} meta values for meta key {}",
                meta_values.len(),
                meta_key
            );
        }

        let mut key_migrated = true;
        for meta_value in meta_values {
            if opts.dry_run || opts.verbose {
                println!(
                    "\tadd_term_meta( {}, '{}', '{}' )",
                    term.term_id,
                    meta_key,
                    elide_long_value(meta_value)
                );
            }
            if opts.dry_run {
                continue;
            }
            match db.add_term_meta(term.term_id, meta_key, meta_value).await {
                MetaAddOutcome::Added(_) => {}
                MetaAddOutcome::Failed(reason) => {
                    key_migrated = false;
                    tracing::warn!(
                        "Error running add_term_meta( {}, '{}', '{}' )",
                        term.term_id,
                        meta_key,
                        elide_long_value(meta_value)
                    );
                    tracing::warn!("\t{}", reason);
                }
            }
        }

        if !key_migrated {
            legacy_meta_cleared = false;
        }

        if opts.destructive {
            if !key_migrated {
                // The legacy rows are the only correct copy now; keep them.
                tracing::warn!(
                    "Skipping Fieldmanager term meta deletion for {} because an error was \
                     encountered while adding data",
                    meta_key
                );
            } else {
                if opts.dry_run || opts.verbose {
                    println!("\tDeleting this term's Fieldmanager term meta for {}", meta_key);
                }
                if !opts.dry_run {
                    if let Err(e) = db
                        .delete_legacy_term_meta(term.term_id, &term.taxonomy, meta_key)
                        .await
                    {
                        legacy_meta_cleared = false;
                        tracing::warn!(
                            "Failed to delete Fieldmanager term meta for {}: {:#}",
                            meta_key,
                            e
                        );
                    }
                }
            }
        }
    }

    // Zero legacy entries remain when the term started empty or every
    // key was migrated and its legacy rows removed.
    let none_remaining = term_meta.is_empty() || (opts.destructive && legacy_meta_cleared);
    if !none_remaining {
        return;
    }

    println!("\tNo Fieldmanager term meta remaining for this term.");

    if !opts.destructive {
        return;
    }

    match db.post_exists(resolved.carrier.id).await {
        Ok(true) => {
            if opts.verbose || opts.dry_run {
                println!("\tDeleting post ID {}", resolved.carrier.id);
            }
            if !opts.dry_run {
                if let Err(e) = db.delete_post(resolved.carrier.id).await {
                    tracing::warn!(
                        "Failed to delete post ID {}: {:#}",
                        resolved.carrier.id,
                        e
                    );
                }
            }
        }
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(
                "Failed to check whether post ID {} exists: {:#}",
                resolved.carrier.id,
                e
            );
        }
    }
}
