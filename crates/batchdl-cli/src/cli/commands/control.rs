//! `batchdl cancel|resume|remove <id>` and `batchdl clear`.

use anyhow::Result;
use batchdl_core::ControlCommand;
use std::path::Path;

use crate::cli::control_socket;

pub async fn run_control(socket_path: &Path, command: ControlCommand) -> Result<()> {
    control_socket::send_line(socket_path, &command.to_json().to_string()).await?;
    match command.id() {
        Some(id) => println!("Sent {} for transfer {id}", command.name()),
        None => println!("Sent {}", command.name()),
    }
    Ok(())
}
