//! Fetch a GitHub user and walk their repositories page by page.
//!
//! ```text
//! GITHUB_TOKEN=<token> cargo run -p horizon-lattice-query --example github_user -- torvalds
//! ```

use horizon_lattice_query::{Argument, Endpoint, HttpTransport, LazyObject, QueryNode};

const GITHUB_GRAPHQL: &str = "https://api.github.com/graphql";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "horizon_lattice_query=info".into()),
        )
        .init();

    let token = std::env::var("GITHUB_TOKEN").map_err(|_| "GITHUB_TOKEN is not set")?;
    let login = std::env::args().nth(1).unwrap_or_else(|| "torvalds".into());

    let transport = HttpTransport::builder().bearer_auth(&token)?.build()?;
    let endpoint = Endpoint::new(&transport, GITHUB_GRAPHQL)?;

    // Single fields on demand
    let mut profile = QueryNode::new("user");
    profile.add_argument("login", login.as_str());
    let mut profile = LazyObject::new(profile);
    let name: Option<String> = profile.get_as(&endpoint, "name")?;
    println!("{login}: {}", name.as_deref().unwrap_or("(no name)"));

    // A whole tree, then its connection lazily
    let mut user = QueryNode::new("user");
    user.add_argument("login", login.as_str());
    user.add_child("bio")?;
    let repositories = user.add_child(QueryNode::connection("repositories").with_page_size(50))?;
    repositories.add_argument("orderBy", Argument::raw("{field: STARGAZERS, direction: DESC}"));
    repositories.add_child("name")?;
    repositories.add_child("stargazerCount")?;

    endpoint.execute(&mut user)?;
    if let Some(bio) = user.child("bio").and_then(QueryNode::value).and_then(|bio| bio.as_str()) {
        println!("bio: {bio}");
    }

    let rows = endpoint
        .iterate_rows(&mut user, "repositories", "name", &["stargazerCount"])?
        .on_fetch_error(|err| eprintln!("stopped early: {err}"));
    for row in rows {
        let [name, stars] = row.as_slice() else {
            continue;
        };
        println!(
            "  {:<40} {:>7}",
            name.as_ref().and_then(|name| name.as_str()).unwrap_or("?"),
            stars.as_ref().map(ToString::to_string).unwrap_or_default()
        );
    }
    Ok(())
}
