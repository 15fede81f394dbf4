use gitvault::GitvaultClient;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔌 Talking to a gitvault server\n");

    let client = GitvaultClient::new("http://localhost:3030");

    if !client.health_check().unwrap_or(false) {
        eprintln!("Error: gitvault server is not running!");
        eprintln!("Start it with: gitvault serve");
        return Ok(());
    }
    println!("✓ Connected to gitvault server\n");

    println!("📝 Saving the invoice model");
    let v1 = client.write_file(
        "model:invoice",
        "object.json",
        r#"{"name":"Invoice","fields":["number"]}"#,
        "Create model: Invoice",
    )?;
    let v2 = client.write_file(
        "model:invoice",
        "object.json",
        r#"{"name":"Invoice","fields":["number","total"]}"#,
        "Add field: total to Invoice",
    )?;
    println!("✓ Saved as version {} and {}\n", v1.version, v2.version);

    println!("📜 History");
    for entry in client.history("model:invoice", "object.json")? {
        println!(
            "  v{} {} {}",
            entry.version,
            &entry.hash[..8],
            entry.message
        );
    }
    println!();

    println!("🔍 What changed");
    print!(
        "{}",
        client.diff("model:invoice", "object.json", &v1.hash, &v2.hash)?
    );
    println!();

    let status = client.sync("model:invoice")?;
    if status.skipped_no_remote {
        println!("ℹ No remote attached; use `gitvault attach` to mirror this model");
    } else if status.ok {
        println!("✓ Mirrored");
    } else {
        println!(
            "⚠ Saved locally, not yet mirrored: {}",
            status.error.unwrap_or_default()
        );
    }

    Ok(())
}
