// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key-material redaction for the log pipeline.
//!
//! Handlers never log key-bearing bodies, but subprocess output and
//! free-form error strings flow through here as a second layer: any
//! base64 key value that appears shortly after a secret-bearing field
//! name is masked before the line reaches the writer.

use std::io::{self, Write};
use tracing_subscriber::fmt::MakeWriter;

const REDACTED: &str = "[REDACTED]";

const SECRET_MARKERS: &[&str] = &[
	"PrivateKey",
	"private_key",
	"privateKey",
	"PresharedKey",
	"preshared_key",
	"preSharedKey",
	"preshared-key",
];

/// Anything shorter cannot be a 32-byte base64 key; leaving short tokens
/// alone keeps ordinary words after these markers readable.
const MIN_KEY_LEN: usize = 40;

/// How far past the marker the value may start (` = `, `":"`, etc).
const MARKER_WINDOW: usize = 8;

pub fn redact(input: &str) -> String {
	let mut ranges: Vec<(usize, usize)> = Vec::new();
	for marker in SECRET_MARKERS {
		for (idx, _) in input.match_indices(marker) {
			if let Some(range) = key_token_after(input, idx + marker.len()) {
				ranges.push(range);
			}
		}
	}
	if ranges.is_empty() {
		return input.to_string();
	}
	ranges.sort_unstable();
	ranges.dedup();

	let mut out = String::with_capacity(input.len());
	let mut cursor = 0;
	for (start, end) in ranges {
		if start < cursor {
			continue;
		}
		out.push_str(&input[cursor..start]);
		out.push_str(REDACTED);
		cursor = end;
	}
	out.push_str(&input[cursor..]);
	out
}

fn key_token_after(input: &str, from: usize) -> Option<(usize, usize)> {
	let bytes = input.as_bytes();
	let mut start = from;
	while start < bytes.len() && !is_key_char(bytes[start]) {
		if start - from >= MARKER_WINDOW {
			return None;
		}
		start += 1;
	}
	let mut end = start;
	while end < bytes.len() && is_key_char(bytes[end]) {
		end += 1;
	}
	(end - start >= MIN_KEY_LEN).then_some((start, end))
}

fn is_key_char(b: u8) -> bool {
	b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}

/// Line-buffered writer that redacts each line before handing it to the
/// underlying writer.
pub struct RedactingWriter<W: Write> {
	inner: W,
	buffer: Vec<u8>,
}

impl<W: Write> Drop for RedactingWriter<W> {
	fn drop(&mut self) {
		let _ = self.flush();
	}
}

impl<W: Write> Write for RedactingWriter<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.buffer.extend_from_slice(buf);

		while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
			let line = String::from_utf8_lossy(&self.buffer[..=newline_pos]).into_owned();
			self.inner.write_all(redact(&line).as_bytes())?;
			self.buffer.drain(..=newline_pos);
		}

		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		if !self.buffer.is_empty() {
			let line = String::from_utf8_lossy(&self.buffer).into_owned();
			self.inner.write_all(redact(&line).as_bytes())?;
			self.buffer.clear();
		}
		self.inner.flush()
	}
}

/// `MakeWriter` wrapper installing [`RedactingWriter`] on the tracing
/// output path.
pub struct RedactingMakeWriter<M> {
	inner: M,
}

impl<M> RedactingMakeWriter<M> {
	pub fn new(inner: M) -> Self {
		Self { inner }
	}
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
	M: MakeWriter<'a>,
{
	type Writer = RedactingWriter<M::Writer>;

	fn make_writer(&'a self) -> Self::Writer {
		RedactingWriter {
			inner: self.inner.make_writer(),
			buffer: Vec::new(),
		}
	}
}
