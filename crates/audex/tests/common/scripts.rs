//! Bodies for fake tool scripts. Each is run by `/bin/sh`.

#![allow(dead_code)]

use std::path::Path;

/// Downloader that records its arguments, writes `{id}.mp3` from the
/// `--output` template and prints `title` as the first stdout line.
pub fn downloader(args_log: &Path, title: &str) -> String {
    format!(
        r#"printf '%s\n' "$@" > '{log}'
out=''
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; shift; fi
  shift
done
out=$(printf '%s' "$out" | sed 's/%(ext)s/mp3/')
printf 'audio' > "$out"
echo '{title}'
"#,
        log = args_log.display(),
        title = title,
    )
}

/// Downloader that hangs while a forked helper writes the output two
/// seconds later.
pub const DOWNLOADER_FORKS_AND_HANGS: &str = r#"out=''
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; shift; fi
  shift
done
out=$(printf '%s' "$out" | sed 's/%(ext)s/mp3/')
( sleep 2; printf audio > "$out" ) &
exec sleep 30
"#;

/// Downloader whose filter rejects the source: clean exit, no file.
pub const DOWNLOADER_FILTERED: &str =
    "echo '[download] Video does not pass filter (duration <= 1800), skipping ..' >&2\n";

/// Downloader that exits cleanly without writing anything.
pub const DOWNLOADER_NO_OUTPUT: &str = "echo 'Phantom'\n";

/// Downloader that fails like an unavailable video.
pub const DOWNLOADER_UNAVAILABLE: &str =
    "echo 'ERROR: Video unavailable' >&2\nexit 1\n";

/// Tool that never finishes on its own.
pub const HANGS: &str = "exec sleep 30\n";

/// Transcoder that writes its last argument.
pub const TRANSCODER: &str = r#"for a in "$@"; do last="$a"; done
printf 'audio' > "$last"
"#;

/// Transcoder that rejects its input.
pub const TRANSCODER_BAD_CODEC: &str = "echo 'bad codec' >&2\nexit 1\n";

/// Probe reporting a fixed duration.
pub const PROBE: &str = "echo 42.0\n";

/// Probe that cannot read the file.
pub const PROBE_NA: &str = "echo N/A\n";
