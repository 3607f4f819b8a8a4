//! Walks every page of a GitHub listing through the `Link` header.
//!
//! ```text
//! RUST_LOG=backoff_http=debug cargo run --example paginate -- rust-lang
//! ```

use backoff_http::{ClientOptions, HttpClient};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
struct Repo {
    full_name: String,
    stargazers_count: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let org = std::env::args().nth(1).unwrap_or_else(|| "rust-lang".to_owned());
    let opts = ClientOptions::from_env().map_err(anyhow::Error::msg)?;
    let client = HttpClient::new().with_options(opts);

    let mut headers = vec![("Accept".to_owned(), "application/vnd.github+json".to_owned())];
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        headers.push(("Authorization".to_owned(), format!("Bearer {token}")));
    }

    let mut next = Some(format!(
        "https://api.github.com/orgs/{org}/repos?per_page=100"
    ));
    let mut total = 0usize;
    while let Some(url) = next {
        let page = client.get(&url, headers.clone()).await?;
        if page.is_not_found() {
            anyhow::bail!("organization {org} not found");
        }
        let repos: Vec<Repo> = page.json()?;
        for repo in &repos {
            println!("{:>8}  {}", repo.stargazers_count, repo.full_name);
        }
        total += repos.len();
        next = page.next_page();
    }

    tracing::info!("listed {} repositories of {}", total, org);
    Ok(())
}
