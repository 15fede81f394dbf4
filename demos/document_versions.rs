use gitvault::{EngineConfig, EntityId, Identity, VersionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("📚 Versioning a document with gitvault\n");

    let workspace = tempfile::tempdir()?;
    let config = EngineConfig::default().with_root(workspace.path().join("repos"));
    let store = VersionStore::new(config)?;
    let doc = EntityId::project("doc1")?;
    let author = Identity::new("Ada Lovelace", "ada@example.com");

    println!("📝 Saving three drafts of content.md");
    let first = store
        .commit(&doc, "content.md", b"# Notes\n\nFirst draft\n", "Create doc1", Some(&author))
        .await?;
    store
        .commit(&doc, "content.md", b"# Notes\n\nSecond draft\n", "Update doc1", Some(&author))
        .await?;
    let last = store
        .commit(&doc, "content.md", b"# Notes\n\nFinal text\n", "Update doc1", None)
        .await?;
    println!("✓ Saved\n");

    println!("💤 Saving identical content again");
    let again = store
        .commit(&doc, "content.md", b"# Notes\n\nFinal text\n", "Update doc1", None)
        .await?;
    println!("✓ created = {}, still at {}\n", again.created, &again.hash[..8]);

    println!("📜 History");
    let history = store.log(&doc, "content.md").await?;
    let total = history.len();
    for (i, commit) in history.iter().enumerate() {
        println!(
            "  v{} {} {} <{}> {}",
            total - i,
            &commit.hash[..8],
            commit.author,
            commit.email,
            commit.message
        );
    }
    println!();

    println!("🔍 Diff between the first and last draft");
    print!("{}", store.diff(&doc, "content.md", &first.hash, &last.hash).await?);
    println!();

    println!("⏪ Content as of the first draft");
    let original = store.read_at(&doc, "content.md", Some(&first.hash)).await?;
    print!("{}", String::from_utf8_lossy(&original));
    println!();

    let sync = store.sync(&doc).await?;
    if sync.skipped_no_remote {
        println!("ℹ No remote attached, history stays local");
    }

    Ok(())
}
