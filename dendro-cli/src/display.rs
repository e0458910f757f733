//! Terminal rendering of jobs and compute clients

use chrono::DateTime;
use colored::*;
use dendro_core::domain::compute_client::ComputeClient;
use dendro_core::domain::job::{Job, JobStatus};

/// Format epoch seconds as a UTC timestamp
pub fn format_timestamp(secs: f64) -> String {
    DateTime::from_timestamp(secs.trunc() as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Colorize job status for display
pub fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Starting => status_str.blue(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}

/// Print a one-entry job summary
pub fn print_job_summary(job: &Job) {
    println!("  {} Job {}", "▸".cyan(), job.job_id.dimmed());
    println!(
        "    Processor: {}/{}",
        job.job_definition.app_name, job.job_definition.processor_name
    );
    println!("    Status:    {}", status_line(job));
    println!(
        "    Created:   {}",
        format_timestamp(job.timestamp_created_sec).dimmed()
    );
    if let Some(name) = &job.compute_client_name {
        println!("    Client:    {}", name.dimmed());
    }
    println!();
}

fn status_line(job: &Job) -> String {
    let mut line = colorize_status(job.status).to_string();
    if job.canceled && !job.status.is_terminal() {
        line.push_str(&format!(" {}", "(cancel requested)".yellow()));
    }
    if job.status == JobStatus::Pending && !job.is_runnable {
        line.push_str(&format!(" {}", "(waiting on dependencies)".dimmed()));
    }
    line
}

/// Print detailed job information
pub fn print_job_details(job: &Job) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.job_id.cyan());
    println!("  Service:     {}", job.service_name);
    println!("  User:        {}", job.user_id);
    println!(
        "  Processor:   {}/{}",
        job.job_definition.app_name, job.job_definition.processor_name
    );
    println!("  Status:      {}", status_line(job));
    if let Some(batch) = &job.batch_id {
        println!("  Batch:       {}", batch);
    }
    if !job.tags.is_empty() {
        println!("  Tags:        {}", job.tags.join(", "));
    }
    println!("  Created:     {}", format_timestamp(job.timestamp_created_sec));
    if let Some(started) = job.timestamp_started_sec {
        println!("  Started:     {}", format_timestamp(started));
    }
    if let Some(finished) = job.timestamp_finished_sec {
        println!("  Finished:    {}", format_timestamp(finished));
        if let Some(started) = job.timestamp_started_sec {
            println!("  Duration:    {:.0}s", finished - started);
        }
    }
    if let Some(client_id) = &job.compute_client_id {
        let name = job.compute_client_name.as_deref().unwrap_or("?");
        println!("  Client:      {} ({})", name, client_id.dimmed());
    }

    let resources = &job.required_resources;
    println!(
        "  Resources:   {} cpu, {} gpu, {} GB, {}s",
        resources.num_cpus, resources.num_gpus, resources.memory_gb, resources.time_sec
    );

    if !job.job_dependencies.is_empty() {
        println!("\n{}", "Depends on:".bold());
        for dependency in &job.job_dependencies {
            println!("  {}", dependency.dimmed());
        }
    }

    if !job.job_definition.parameters.is_empty() {
        println!("\n{}", "Parameters:".bold());
        for param in &job.job_definition.parameters {
            println!("  {} = {}", param.name.cyan(), param.value);
        }
    }

    if !job.output_file_results.is_empty() {
        println!("\n{}", "Outputs:".bold());
        for output in &job.output_file_results {
            println!("  {} {}", output.name.cyan(), output.url);
        }
    }
    println!("\n  Console:     {}", job.console_output_url.dimmed());

    if let Some(error) = &job.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

/// Print a compute client
pub fn print_compute_client(client: &ComputeClient) {
    println!("{}", "Compute Client:".bold());
    println!("  ID:          {}", client.compute_client_id.cyan());
    println!("  Name:        {}", client.compute_client_name);
    println!("  Owner:       {}", client.user_id);
    if !client.description.is_empty() {
        println!("  Description: {}", client.description);
    }
    println!("  Services:    {}", client.service_names.join(", "));
    match &client.process_jobs_for_users {
        Some(users) => println!("  Users:       {}", users.join(", ")),
        None => println!("  Users:       {}", "any".dimmed()),
    }
    println!("  Registered:  {}", format_timestamp(client.timestamp_created_sec));
    match client.timestamp_last_active_sec {
        Some(active) => println!("  Last active: {}", format_timestamp(active)),
        None => println!("  Last active: {}", "never".dimmed()),
    }

    println!("\n{}", "Slots:".bold());
    for slot in &client.compute_slots {
        println!(
            "  {} x{}  cpu {}-{}  gpu {}-{}  mem {}-{} GB  time {}-{}s",
            "▸".cyan(),
            slot.multiplicity,
            slot.num_cpus_min,
            slot.num_cpus_max,
            slot.num_gpus_min,
            slot.num_gpus_max,
            slot.memory_gb_min,
            slot.memory_gb_max,
            slot.time_sec_min,
            slot.time_sec_max
        );
    }
}
