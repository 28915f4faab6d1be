//! Pack and version ids embedded in an installer's file name,
//! e.g. `serverinstall_126_12000` or `serverinstall_126`.

use anyhow::Result;

/// `(pack_id, version_id)` from the first `_<digits>` group and an optional
/// `_<digits>` right after it.
pub fn parse_installer_name(name: &str) -> Result<(u64, Option<u64>)> {
    let mut rest = name;
    while let Some(pos) = rest.find('_') {
        rest = &rest[pos + 1..];
        let (pack, after) = leading_digits(rest);
        if pack.is_empty() {
            continue;
        }
        let pack_id: u64 = pack.parse()?;
        let version_id = match after.strip_prefix('_').map(leading_digits) {
            Some((digits, _)) if !digits.is_empty() => Some(digits.parse()?),
            _ => None,
        };
        return Ok((pack_id, version_id));
    }
    anyhow::bail!("no pack/version id in installer name '{}'", name)
}

fn leading_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}
