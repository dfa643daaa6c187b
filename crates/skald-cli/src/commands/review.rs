//! Review command implementations.

use super::parse_id;
use crate::cli::{IdArgs, ModifyArgs, PendingArgs, RejectArgs};
use crate::error::Result;
use crate::output::Formatter;
use skald_domain::traits::SuggestionStore;
use skald_review::SuggestionLifecycle;
use skald_store::SqliteStore;

/// Execute the pending command.
pub fn execute_pending(
    args: PendingArgs,
    store: &SqliteStore,
    lifecycle: &SuggestionLifecycle,
    formatter: &Formatter,
) -> Result<()> {
    let suggestions = lifecycle.list_pending(store, args.scope, args.limit)?;
    println!("{}", formatter.format_suggestions(&suggestions)?);
    Ok(())
}

/// Execute the show command.
pub fn execute_show(
    args: IdArgs,
    store: &SqliteStore,
    lifecycle: &SuggestionLifecycle,
    formatter: &Formatter,
) -> Result<()> {
    let id = parse_id(&args.id)?;
    let suggestion = lifecycle.get(store, id)?;
    let features = store.get_features(id)?;
    let feedback = store.get_feedback(id)?;

    println!("{}", formatter.format_detail(&suggestion, &features, feedback.as_ref())?);
    Ok(())
}

/// Execute the accept command.
pub fn execute_accept(
    args: IdArgs,
    store: &mut SqliteStore,
    lifecycle: &SuggestionLifecycle,
    actor: &str,
    formatter: &Formatter,
) -> Result<()> {
    let outcome = lifecycle.accept(store, parse_id(&args.id)?, actor)?;
    println!("{}", formatter.format_outcome(&outcome)?);
    Ok(())
}

/// Execute the reject command.
pub fn execute_reject(
    args: RejectArgs,
    store: &mut SqliteStore,
    lifecycle: &SuggestionLifecycle,
    actor: &str,
    formatter: &Formatter,
) -> Result<()> {
    let outcome = lifecycle.reject(store, parse_id(&args.id)?, actor, args.text)?;
    println!("{}", formatter.format_outcome(&outcome)?);
    Ok(())
}

/// Execute the modify command.
pub fn execute_modify(
    args: ModifyArgs,
    store: &mut SqliteStore,
    lifecycle: &SuggestionLifecycle,
    actor: &str,
    formatter: &Formatter,
) -> Result<()> {
    let outcome = lifecycle.modify(
        store,
        parse_id(&args.id)?,
        actor,
        args.relationship_type.as_deref(),
        args.strength,
        args.text,
    )?;
    println!("{}", formatter.format_outcome(&outcome)?);
    Ok(())
}

/// Execute the dismiss command.
pub fn execute_dismiss(
    args: IdArgs,
    store: &mut SqliteStore,
    lifecycle: &SuggestionLifecycle,
    actor: &str,
    formatter: &Formatter,
) -> Result<()> {
    let outcome = lifecycle.dismiss(store, parse_id(&args.id)?, actor)?;
    println!("{}", formatter.format_outcome(&outcome)?);
    Ok(())
}
