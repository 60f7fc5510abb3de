use std::path::{Path, PathBuf};

use rmcp::{
    ServiceExt,
    model::CallToolRequestParams,
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::json;

const FILES: &[&str] = &[
    "Base/Group_A/Ivanov_Petr_01.02.1985/CV.pdf",
    "Base/Group_A/Ivanov_Petr_01.02.1985/Ivanov_Petr.txt",
    "Base/Group_A/Ivanov_Ivan_03.04.1990/notes.txt",
];

fn setup_fixture(root: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    for file in FILES {
        let path = root.join(file);
        std::fs::create_dir_all(path.parent().unwrap())?;
        std::fs::write(&path, format!("Contents of {file}"))?;
    }
    std::fs::write(root.join("files.txt"), FILES.join("\n"))?;

    let config = json!({
        "file_list_path": "files.txt",
        "base_folder_name": "Base",
        "birthdays": { "Ivanov Petr 01.02.1985": "01.02" }
    });
    let config_path = root.join("dossier.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    Ok(config_path)
}

async fn call(
    client: &rmcp::service::RunningService<rmcp::RoleClient, ()>,
    tool: &'static str,
    args: serde_json::Value,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let result = client
        .peer()
        .call_tool(
            CallToolRequestParams::new(tool).with_arguments(args.as_object().unwrap().clone()),
        )
        .await?;
    Ok(result.structured_content.expect("structured content"))
}

#[tokio::test]
async fn mcp_stdio_conversation_roundtrip() -> Result<(), Box<dyn std::error::Error>>
{
    let tempdir = tempfile::tempdir()?;
    let config_path = setup_fixture(tempdir.path())?;
    let data_dir = tempdir.path().join("data");

    let bin = dossier_bin()?;
    let transport = TokioChildProcess::new(
        tokio::process::Command::new(bin).configure(|cmd| {
            cmd.arg("mcp")
                .env("DOSSIER_DATA_DIR", &data_dir)
                .env("DOSSIER_CONFIG", &config_path)
                .env_remove("GEMINI_API_KEY");
        }),
    )?;

    let client = ().serve(transport).await?;

    let structured = call(
        &client,
        "dossier_message",
        json!({ "userId": 11, "text": "ivanov" }),
    )
    .await?;
    let replies = structured
        .get("replies")
        .and_then(|v| v.as_array())
        .expect("replies array");
    assert_eq!(replies.len(), 1);
    let card = replies[0]["text"].as_str().unwrap_or_default();
    assert!(card.contains("(1 / 2)"), "{card}");

    let structured = call(
        &client,
        "dossier_press",
        json!({ "userId": 11, "data": "card:next:1" }),
    )
    .await?;
    let card = structured["replies"][0]["text"].as_str().unwrap_or_default();
    assert!(card.contains("Ivanov Petr"), "{card}");

    let structured = call(
        &client,
        "dossier_press",
        json!({ "userId": 11, "data": "select_folder:1" }),
    )
    .await?;
    let replies = structured["replies"].as_array().expect("replies array");
    assert!(
        replies
            .iter()
            .any(|r| r["kind"] == "document" && r["caption"] == "CV.pdf")
    );

    let structured = call(
        &client,
        "dossier_message",
        json!({ "userId": 11, "text": "/birthdays" }),
    )
    .await?;
    assert_eq!(structured["replies"][0]["kind"], "text");

    client.cancel().await?;
    Ok(())
}

fn dossier_bin() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Ok(bin) = std::env::var("CARGO_BIN_EXE_dossier") {
        return Ok(PathBuf::from(bin));
    }

    let mut path = std::env::current_exe()?;
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("dossier");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    Ok(path)
}
