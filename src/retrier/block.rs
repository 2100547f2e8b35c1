//! Line-range helpers over pretty-printed payloads. They rely on one
//! selection per line with nested blocks indented deeper than their parent.

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Index of the line closing the block opened at `start`, or `start` itself
/// when that line does not open a block. A field whose arguments span
/// several lines (`field(` ... `) {`) is treated as one block.
pub fn find_block_end(payload: &str, start: usize) -> usize {
    let lines: Vec<&str> = payload.split('\n').collect();
    let Some(opening) = lines.get(start) else {
        return start;
    };
    let target = indentation(opening);

    let mut header_end = start;
    if opening.trim_end().ends_with('(') {
        let Some(offset) = lines[start + 1..]
            .iter()
            .position(|line| indentation(line) == target && line.trim_start().starts_with(')'))
        else {
            return lines.len().saturating_sub(1);
        };
        header_end = start + 1 + offset;
    }
    if !lines[header_end].trim_end().ends_with('{') {
        return header_end;
    }

    let mut current = header_end + 1;
    while current < lines.len() {
        let line = lines[current];
        if !line.trim().is_empty() && indentation(line) <= target {
            return current;
        }
        current += 1;
    }
    lines.len().saturating_sub(1)
}

/// Drops lines `start..=end`.
pub fn remove_lines_within_range(payload: &str, start: usize, end: usize) -> String {
    payload
        .split('\n')
        .enumerate()
        .filter(|(i, _)| *i < start || *i > end)
        .map(|(_, line)| line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes `field {` lines immediately closed by a matching `}`, repeatedly,
/// so a removal that empties a parent selection removes the parent too.
pub fn prune_empty_blocks(payload: &str) -> String {
    let mut lines: Vec<&str> = payload.split('\n').collect();
    loop {
        let empty = lines.windows(2).position(|pair| {
            pair[0].trim_end().ends_with('{')
                && pair[1].trim() == "}"
                && indentation(pair[0]) == indentation(pair[1])
        });
        match empty {
            Some(i) => {
                lines.drain(i..=i + 1);
            }
            None => break,
        }
    }
    lines.join("\n")
}
