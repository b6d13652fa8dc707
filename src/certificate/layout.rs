use super::font::Typeface;

/// Fixed padding added per line position.
pub const LINE_PADDING: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
}

/// Centers every line horizontally and stacks them from `inset.1` downwards.
///
/// The padding multiplier is the index of the first line equal to the current
/// one, so repeated lines share the padding of their first occurrence while
/// still accumulating their own measured height.
pub fn layout<S: AsRef<str>>(
    lines: &[S],
    face: &dyn Typeface,
    canvas_width: u32,
    inset: (i32, i32),
) -> Vec<Placement> {
    let (inset_x, inset_y) = inset;
    let mut total_height = 0i32;
    let mut placements = Vec::with_capacity(lines.len());

    for line in lines {
        let line = line.as_ref();
        let (line_w, line_h) = face.measure(line);
        let index = lines
            .iter()
            .position(|l| l.as_ref() == line)
            .unwrap_or_default() as i32;

        let x = (canvas_width as i32 - 2 * inset_x - line_w as i32).div_euclid(2);
        let y = inset_y + total_height + LINE_PADDING * index;
        total_height += line_h as i32;

        placements.push(Placement { x, y });
    }

    placements
}
