//! `list` (§6): tabulate every registered profile.

use clap::Args;

use crate::error::ZielenError;
use crate::profile::{list_profiles, Profile, Status};

#[derive(Debug, Args)]
pub struct ListArgs {}

fn status_label(status: Status) -> &'static str {
	match status {
		Status::Partial => "partial",
		Status::Initialized => "initialized",
	}
}

pub fn run(_args: ListArgs, config_home: &std::path::Path) -> Result<(), ZielenError> {
	let names = list_profiles(config_home)?;
	if names.is_empty() {
		println!("-- No profiles --");
		return Ok(());
	}

	let mut rows = vec![(
		"Profile".to_string(),
		"Status".to_string(),
		"Local Directory".to_string(),
		"Remote Directory".to_string(),
		"Limit".to_string(),
	)];
	for name in names {
		let profile = Profile::new(config_home, &name);
		let Ok(config) = profile.load_config() else { continue };
		let status = profile.read_info().map(|info| status_label(info.status)).unwrap_or("unknown");
		rows.push((
			name,
			status.to_string(),
			config.local_dir.display().to_string(),
			config.remote_dir.display().to_string(),
			config.storage_limit.to_string(),
		));
	}

	let widths: Vec<usize> = (0..5)
		.map(|col| {
			rows.iter()
				.map(|row| match col {
					0 => row.0.len(),
					1 => row.1.len(),
					2 => row.2.len(),
					3 => row.3.len(),
					_ => row.4.len(),
				})
				.max()
				.unwrap_or(0)
		})
		.collect();

	for row in &rows {
		println!(
			"{:<w0$}  {:<w1$}  {:<w2$}  {:<w3$}  {:<w4$}",
			row.0,
			row.1,
			row.2,
			row.3,
			row.4,
			w0 = widths[0],
			w1 = widths[1],
			w2 = widths[2],
			w3 = widths[3],
			w4 = widths[4],
		);
	}
	Ok(())
}

// vim: ts=4
