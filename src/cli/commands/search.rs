use anyhow::Result;

use crate::cli::{SearchArgs, Session};

/// Execute the search command. No text clears the query.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(args: &SearchArgs, session: &Session) -> Result<()> {
    let query = args.text.join(" ");
    session.store.set_search_query(query.trim());

    if session.out.json {
        println!("{}", serde_json::to_string_pretty(&session.store.filters())?);
    } else if query.trim().is_empty() {
        println!("Search cleared");
    } else {
        println!("Search set to \"{}\"", query.trim());
    }
    Ok(())
}
