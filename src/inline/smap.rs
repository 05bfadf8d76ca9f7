//! Source maps for inlined code
//!
//! When a body is inlined, its line numbers end up inside another method, so
//! debugger fidelity depends on mapping the synthesized output lines back to
//! (original file, original line). A class compiled from inline-heavy code
//! carries a JSR-45 `SourceDebugExtension` describing that mapping; when the
//! attribute is absent the map degenerates to the identity over the line
//! range observed while loading the method.

use crate::jvm::Error;

/// Minimum and maximum source line observed across a method's line-number
/// pseudo-instructions
///
/// Starts out empty and widens one line at a time; a method with no line
/// info stays empty rather than carrying an inverted sentinel pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLineRange {
    bounds: Option<(u16, u16)>,
}

impl SourceLineRange {
    pub fn empty() -> SourceLineRange {
        SourceLineRange { bounds: None }
    }

    /// Widen the range to include `line`
    pub fn observe(&mut self, line: u16) {
        self.bounds = match self.bounds {
            None => Some((line, line)),
            Some((min, max)) => Some((min.min(line), max.max(line))),
        };
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// `(min, max)` with `min <= max`, if any line was observed
    pub fn bounds(&self) -> Option<(u16, u16)> {
        self.bounds
    }
}

/// One contiguous run of the line mapping
///
/// Maps `range` output lines starting at `dest` back to input lines starting
/// at `source` of one input file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeMapping {
    pub source: u32,
    pub dest: u32,
    pub range: u32,
}

impl RangeMapping {
    fn maps_output(&self, line: u32) -> bool {
        line >= self.dest && line < self.dest + self.range
    }
}

/// One input file of the map plus its line ranges
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMapping {
    pub name: String,
    pub path: String,
    pub line_mappings: Vec<RangeMapping>,
}

/// Mapping from synthesized output lines back to (file, input line)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMap {
    file_mappings: Vec<FileMapping>,
}

impl SourceMap {
    /// Parse the debug descriptor if one is present, else synthesize the
    /// identity map over `range` anchored at the target class
    ///
    /// `source` is the class-level source file name and `internal_name` the
    /// slash-separated name of the class being loaded; the identity map uses
    /// the internal name with a `.kt`-style source path derived from it.
    pub fn parse_or_create_default(
        debug_info: Option<&str>,
        source: Option<&str>,
        internal_name: &str,
        range: SourceLineRange,
    ) -> Result<SourceMap, Error> {
        match debug_info {
            Some(descriptor) if !descriptor.trim().is_empty() => parse_smap(descriptor),
            _ => {
                log::debug!(
                    "No debug descriptor on {}, falling back to an identity map",
                    internal_name
                );
                Ok(SourceMap::identity(source, internal_name, range))
            }
        }
    }

    /// One-to-one map over `range`, a single file anchored at the class
    pub fn identity(
        source: Option<&str>,
        internal_name: &str,
        range: SourceLineRange,
    ) -> SourceMap {
        let name = source.unwrap_or("").to_string();
        let line_mappings = match range.bounds() {
            None => vec![],
            Some((min, max)) => vec![RangeMapping {
                source: min as u32,
                dest: min as u32,
                range: (max - min) as u32 + 1,
            }],
        };
        SourceMap {
            file_mappings: vec![FileMapping {
                name,
                path: internal_name.to_string(),
                line_mappings,
            }],
        }
    }

    pub fn file_mappings(&self) -> &[FileMapping] {
        &self.file_mappings
    }

    /// Resolve an output line back to `(file name, input line)`
    pub fn map_line(&self, output_line: u32) -> Option<(&str, u32)> {
        for file in &self.file_mappings {
            for mapping in &file.line_mappings {
                if mapping.maps_output(output_line) {
                    let input = mapping.source + (output_line - mapping.dest);
                    return Some((file.name.as_str(), input));
                }
            }
        }
        None
    }
}

/// Parse a JSR-45 SMAP descriptor (the `*F` file and `*L` line sections of
/// the first stratum)
fn parse_smap(descriptor: &str) -> Result<SourceMap, Error> {
    let mut lines = descriptor.lines();
    match lines.next() {
        Some("SMAP") => (),
        other => {
            return Err(Error::BadClassFile(format!(
                "Debug descriptor does not start with SMAP header: {:?}",
                other
            )))
        }
    }

    // generated-file name and default stratum name, unused here
    let _generated = lines.next();
    let _stratum = lines.next();

    let mut files: Vec<(u32, FileMapping)> = vec![];
    let mut ranges: Vec<(u32, RangeMapping)> = vec![];
    let mut section = "";
    let mut pending_file: Option<(u32, String)> = None;

    for line in lines {
        let line = line.trim_end();
        if line.starts_with("*") {
            if let Some((id, name)) = pending_file.take() {
                files.push((id, FileMapping { name: name.clone(), path: name, line_mappings: vec![] }));
            }
            section = match line {
                "*F" => "F",
                "*L" => "L",
                "*E" => break,
                _ => "", // *S <name> and vendor sections are skipped
            };
            continue;
        }
        match section {
            "F" => {
                if let Some((id, name)) = pending_file.take() {
                    // previous "+ id name" entry, this line is its path
                    files.push((
                        id,
                        FileMapping {
                            name,
                            path: line.to_string(),
                            line_mappings: vec![],
                        },
                    ));
                    continue;
                }
                let with_path = line.starts_with("+ ");
                let rest = if with_path { &line[2..] } else { line };
                let (id, name) = split_file_entry(rest)?;
                if with_path {
                    pending_file = Some((id, name));
                } else {
                    files.push((
                        id,
                        FileMapping {
                            name: name.clone(),
                            path: name,
                            line_mappings: vec![],
                        },
                    ));
                }
            }
            "L" => ranges.push(parse_line_entry(line, ranges.last().map(|(id, _)| *id))?),
            _ => (),
        }
    }
    if let Some((id, name)) = pending_file.take() {
        files.push((id, FileMapping { name: name.clone(), path: name, line_mappings: vec![] }));
    }

    for (file_id, range) in ranges {
        match files.iter_mut().find(|(id, _)| *id == file_id) {
            Some((_, file)) => file.line_mappings.push(range),
            None => {
                return Err(Error::BadClassFile(format!(
                    "SMAP line entry refers to unknown file id {}",
                    file_id
                )))
            }
        }
    }

    Ok(SourceMap {
        file_mappings: files.into_iter().map(|(_, file)| file).collect(),
    })
}

fn split_file_entry(entry: &str) -> Result<(u32, String), Error> {
    let mut parts = entry.splitn(2, ' ');
    let id = parts
        .next()
        .and_then(|raw| raw.parse::<u32>().ok())
        .ok_or_else(|| Error::BadClassFile(format!("Bad SMAP file entry: {}", entry)))?;
    let name = parts
        .next()
        .ok_or_else(|| Error::BadClassFile(format!("SMAP file entry without a name: {}", entry)))?;
    Ok((id, name.to_string()))
}

/// Parse `inputStart[#fileId][,repeat]:outputStart[,increment]`
///
/// The file id is sticky: entries without one inherit it from the previous
/// entry (file 1 at the start of the section).
fn parse_line_entry(entry: &str, previous_file: Option<u32>) -> Result<(u32, RangeMapping), Error> {
    let bad = || Error::BadClassFile(format!("Bad SMAP line entry: {}", entry));

    let (input_part, output_part) = entry.split_once(':').ok_or_else(bad)?;

    let (input_part, repeat) = match input_part.split_once(',') {
        Some((head, count)) => (head, count.parse::<u32>().map_err(|_| bad())?),
        None => (input_part, 1),
    };
    let (input_start, file_id) = match input_part.split_once('#') {
        Some((start, id)) => (
            start.parse::<u32>().map_err(|_| bad())?,
            id.parse::<u32>().map_err(|_| bad())?,
        ),
        None => (
            input_part.parse::<u32>().map_err(|_| bad())?,
            previous_file.unwrap_or(1),
        ),
    };

    // the output increment only matters for multi-line output runs, which
    // the inliner never emits; accept and ignore it
    let output_start = match output_part.split_once(',') {
        Some((start, _increment)) => start.parse::<u32>().map_err(|_| bad())?,
        None => output_part.parse::<u32>().map_err(|_| bad())?,
    };

    Ok((
        file_id,
        RangeMapping {
            source: input_start,
            dest: output_start,
            range: repeat,
        },
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    const KOTLIN_SMAP: &str = "SMAP\n\
        Caller.kt\n\
        Kotlin\n\
        *S Kotlin\n\
        *F\n\
        + 1 Caller.kt\n\
        com/example/Caller.kt\n\
        + 2 Util.kt\n\
        com/example/Util.kt\n\
        *L\n\
        1#1,12:1\n\
        7#2,3:13\n\
        *E\n";

    #[test]
    fn line_range_widens_and_stays_ordered() {
        let mut range = SourceLineRange::empty();
        assert!(range.is_empty());
        range.observe(17);
        range.observe(4);
        range.observe(9);
        assert_eq!(range.bounds(), Some((4, 17)));
    }

    #[test]
    fn identity_map_covers_the_recorded_range() {
        let mut range = SourceLineRange::empty();
        range.observe(10);
        range.observe(20);
        let map = SourceMap::identity(Some("File.kt"), "com/example/File", range);

        assert_eq!(map.map_line(10), Some(("File.kt", 10)));
        assert_eq!(map.map_line(20), Some(("File.kt", 20)));
        assert_eq!(map.map_line(21), None);
        assert_eq!(map.map_line(9), None);
    }

    #[test]
    fn identity_map_over_no_lines_maps_nothing() {
        let map = SourceMap::identity(None, "com/example/File", SourceLineRange::empty());
        assert_eq!(map.map_line(1), None);
        assert_eq!(map.file_mappings().len(), 1);
        assert!(map.file_mappings()[0].line_mappings.is_empty());
    }

    #[test]
    fn smap_descriptor_is_parsed_over_the_identity_fallback() {
        let mut range = SourceLineRange::empty();
        range.observe(1);
        let map = SourceMap::parse_or_create_default(
            Some(KOTLIN_SMAP),
            Some("Caller.kt"),
            "com/example/Caller",
            range,
        )
        .unwrap();

        // identity part of the map
        assert_eq!(map.map_line(5), Some(("Caller.kt", 5)));
        // spliced-in region points back into the inlined file
        assert_eq!(map.map_line(13), Some(("Util.kt", 7)));
        assert_eq!(map.map_line(15), Some(("Util.kt", 9)));
        assert_eq!(map.map_line(16), None);
    }

    #[test]
    fn missing_descriptor_falls_back_to_identity() {
        let mut range = SourceLineRange::empty();
        range.observe(3);
        let map =
            SourceMap::parse_or_create_default(None, Some("X.kt"), "com/example/X", range).unwrap();
        assert_eq!(map.map_line(3), Some(("X.kt", 3)));
    }

    #[test]
    fn garbage_descriptor_is_an_error() {
        let result = SourceMap::parse_or_create_default(
            Some("not an smap"),
            None,
            "com/example/X",
            SourceLineRange::empty(),
        );
        assert!(matches!(result, Err(Error::BadClassFile(_))));
    }
}
