use std::path::PathBuf;

use ssm_tool_core::tool::Tool;
use ssm_tool_driver::config::ToolConfig;
use ssm_tool_driver::jobs::load_jobs;

fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

#[test]
fn demo_parameter_jobs_load_in_order() {
    let jobs = load_jobs(Tool::Parameter, &demos_dir().join("parameter")).expect("demo jobs load");

    let summaries: Vec<(String, String)> = jobs
        .iter()
        .map(|job| (job.label.clone(), job.document.summary()))
        .collect();
    assert_eq!(
        summaries,
        vec![
            ("01_create_ami_ids".to_string(), "create".to_string()),
            ("02_remove_old_ami".to_string(), "remove".to_string()),
        ]
    );
}

#[test]
fn demo_run_document_job_loads() {
    let jobs = load_jobs(Tool::RunDocument, &demos_dir().join("run_document")).expect("demo job loads");
    assert_eq!(jobs.len(), 1);
    assert_eq!(
        jobs[0].document.summary(),
        "run_document:CrowdStrikeFalconInstall-ubuntu"
    );
}

#[test]
fn demo_parameter_jobs_are_rejected_by_run_document_tool() {
    assert!(load_jobs(Tool::RunDocument, &demos_dir().join("parameter")).is_err());
}

#[test]
fn demo_config_resolves_every_tool() {
    let config = ToolConfig::load(&demos_dir().join("ssm_tool.json")).expect("demo config loads");
    let prod = config.stage("prod").expect("prod stage");

    let settings = prod.poll_settings(None, None).expect("poll settings");
    assert_eq!(settings.max_polls, 55);
    assert_eq!(settings.poll_interval.as_secs(), 60);

    for tool in Tool::ALL {
        assert!(prod
            .state_machine_arn(tool)
            .starts_with("arn:aws:states:us-east-1:222222222222:stateMachine:"));
    }
}
