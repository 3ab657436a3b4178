use crate::{
    foundation::core::Point,
    foundation::error::{UndulaError, UndulaResult},
    path::model::{ParsedPath, PathCmd, PointKind},
};

/// Parse SVG path data into a [`ParsedPath`].
///
/// Supported commands: `M`/`L`/`C`/`S`/`Q`/`T`/`H`/`V`/`Z` in absolute and
/// relative form. Smooth and quadratic variants are normalized to plain
/// cubics, `H`/`V` expand to lines.
///
/// `origin` is added to the first move and to every subsequent absolute
/// coordinate; relative coordinates are never offset. Unknown command letters
/// fail the parse rather than being skipped: a silently-dropped command
/// corrupts the point buffer for every consumer downstream.
#[tracing::instrument(skip(data), fields(len = data.len()))]
pub fn parse(data: &str, origin: (f64, f64)) -> UndulaResult<ParsedPath> {
    Parser::new(data, origin).run()
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(data: &'a str) -> Self {
        Self {
            bytes: data.as_bytes(),
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Next command letter, if the next token is alphabetic.
    fn take_command(&mut self) -> Option<(u8, usize)> {
        self.skip_separators();
        match self.bytes.get(self.pos) {
            Some(&b) if b.is_ascii_alphabetic() => {
                let at = self.pos;
                self.pos += 1;
                Some((b, at))
            }
            _ => None,
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_separators();
        self.pos >= self.bytes.len()
    }

    /// Whether a numeric token starts at the cursor (used for implicit
    /// command repetition).
    fn peek_number(&mut self) -> bool {
        self.skip_separators();
        matches!(
            self.bytes.get(self.pos),
            Some(b'+' | b'-' | b'.' | b'0'..=b'9')
        )
    }

    fn take_number(&mut self) -> UndulaResult<f64> {
        self.skip_separators();
        let start = self.pos;
        let b = self.bytes;
        let mut i = self.pos;

        if matches!(b.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let int_digits = Self::eat_digits(b, &mut i);
        let mut frac_digits = 0;
        if matches!(b.get(i), Some(b'.')) {
            i += 1;
            frac_digits = Self::eat_digits(b, &mut i);
        }
        if int_digits == 0 && frac_digits == 0 {
            return Err(self.token_error(start, "expected number"));
        }
        if matches!(b.get(i), Some(b'e' | b'E')) {
            let mut j = i + 1;
            if matches!(b.get(j), Some(b'+' | b'-')) {
                j += 1;
            }
            if Self::eat_digits(b, &mut j) > 0 {
                i = j;
            }
        }

        let slice = std::str::from_utf8(&b[start..i])
            .map_err(|_| self.token_error(start, "non-ascii number"))?;
        let value: f64 = slice
            .parse()
            .map_err(|_| self.token_error(start, "malformed number"))?;
        self.pos = i;
        Ok(value)
    }

    fn eat_digits(b: &[u8], i: &mut usize) -> usize {
        let start = *i;
        while matches!(b.get(*i), Some(b'0'..=b'9')) {
            *i += 1;
        }
        *i - start
    }

    fn token_error(&self, at: usize, what: &str) -> UndulaError {
        let end = (at + 12).min(self.bytes.len());
        let near = String::from_utf8_lossy(&self.bytes[at..end]);
        UndulaError::parse(format!("{what} at offset {at} (near '{near}')"))
    }
}

struct Parser<'a> {
    lex: Lexer<'a>,
    origin: Point,

    commands: Vec<PathCmd>,
    points: Vec<Point>,
    kinds: Vec<PointKind>,
    subpaths: Vec<(std::ops::Range<usize>, bool)>,

    current: Point,
    subpath_start: Point,
    subpath_begin_idx: usize,
    /// A drawing command right after `Z` restarts a subpath at the closed
    /// subpath's initial point, via an implicit move.
    pending_restart: bool,
    /// Second control point of the previous cubic, for `S` reflection.
    prev_cubic_ctrl: Option<Point>,
    /// Control point of the previous quadratic, for `T` reflection.
    prev_quad_ctrl: Option<Point>,
}

impl<'a> Parser<'a> {
    fn new(data: &'a str, origin: (f64, f64)) -> Self {
        Self {
            lex: Lexer::new(data),
            origin: Point::new(origin.0, origin.1),
            commands: Vec::new(),
            points: Vec::new(),
            kinds: Vec::new(),
            subpaths: Vec::new(),
            current: Point::ORIGIN,
            subpath_start: Point::ORIGIN,
            subpath_begin_idx: 0,
            pending_restart: false,
            prev_cubic_ctrl: None,
            prev_quad_ctrl: None,
        }
    }

    fn run(mut self) -> UndulaResult<ParsedPath> {
        let mut seen_any = false;
        while !self.lex.at_end() {
            let (letter, at) = self.lex.take_command().ok_or_else(|| {
                let at = self.lex.pos;
                self.lex
                    .token_error(at, "expected command letter before coordinates")
            })?;
            if !seen_any && !matches!(letter, b'M' | b'm') {
                return Err(self.lex.token_error(at, "path must start with a move"));
            }
            seen_any = true;
            self.command(letter, at)?;
        }
        self.finish_subpath(false);
        Ok(ParsedPath::new(
            self.commands,
            self.points,
            self.kinds,
            self.subpaths,
        ))
    }

    fn command(&mut self, letter: u8, at: usize) -> UndulaResult<()> {
        let relative = letter.is_ascii_lowercase();
        match letter.to_ascii_uppercase() {
            b'M' => self.move_to(relative),
            b'L' => self.repeat(|p| p.line_pair(relative)),
            b'H' => self.repeat(|p| p.horizontal(relative)),
            b'V' => self.repeat(|p| p.vertical(relative)),
            b'C' => self.repeat(|p| p.cubic(relative)),
            b'S' => self.repeat(|p| p.smooth_cubic(relative)),
            b'Q' => self.repeat(|p| p.quadratic(relative)),
            b'T' => self.repeat(|p| p.smooth_quadratic(relative)),
            b'Z' => {
                self.close();
                Ok(())
            }
            other => Err(self.lex.token_error(
                at,
                &format!("unsupported path command '{}'", other as char),
            )),
        }
    }

    /// Run one coordinate-set handler for as long as numbers follow.
    fn repeat(&mut self, mut f: impl FnMut(&mut Self) -> UndulaResult<()>) -> UndulaResult<()> {
        loop {
            f(self)?;
            if !self.lex.peek_number() {
                return Ok(());
            }
        }
    }

    /// Read one coordinate pair, resolving relative form and origin offset.
    fn pair(&mut self, relative: bool) -> UndulaResult<Point> {
        let x = self.lex.take_number()?;
        let y = self.lex.take_number()?;
        Ok(if relative {
            Point::new(self.current.x + x, self.current.y + y)
        } else {
            Point::new(x + self.origin.x, y + self.origin.y)
        })
    }

    fn move_to(&mut self, relative: bool) -> UndulaResult<()> {
        // The first move of a relative path still lands at origin + delta;
        // resolve it as absolute against the configured origin.
        let p = if relative && !self.points.is_empty() {
            self.pair(true)?
        } else {
            self.pair(false)?
        };
        self.finish_subpath(false);
        self.pending_restart = false;
        self.subpath_begin_idx = self.points.len();
        self.push_point(p, PointKind::SubpathStart);
        self.commands.push(PathCmd::MoveTo);
        self.current = p;
        self.subpath_start = p;
        self.clear_ctrl();

        // Extra pairs after a move are implicit line-tos.
        while self.lex.peek_number() {
            self.line_pair(relative)?;
        }
        Ok(())
    }

    /// Emit the implicit move if the previous command was a close, so the
    /// restarted subpath carries its own start point.
    fn begin_segment(&mut self) {
        if self.pending_restart {
            self.pending_restart = false;
            self.subpath_begin_idx = self.points.len();
            self.push_point(self.subpath_start, PointKind::SubpathStart);
            self.commands.push(PathCmd::MoveTo);
        }
    }

    fn line_to(&mut self, p: Point) {
        self.begin_segment();
        self.push_point(p, PointKind::Line);
        self.commands.push(PathCmd::LineTo);
        self.current = p;
        self.clear_ctrl();
    }

    fn line_pair(&mut self, relative: bool) -> UndulaResult<()> {
        let p = self.pair(relative)?;
        self.line_to(p);
        Ok(())
    }

    fn horizontal(&mut self, relative: bool) -> UndulaResult<()> {
        let x = self.lex.take_number()?;
        let x = if relative {
            self.current.x + x
        } else {
            x + self.origin.x
        };
        self.line_to(Point::new(x, self.current.y));
        Ok(())
    }

    fn vertical(&mut self, relative: bool) -> UndulaResult<()> {
        let y = self.lex.take_number()?;
        let y = if relative {
            self.current.y + y
        } else {
            y + self.origin.y
        };
        self.line_to(Point::new(self.current.x, y));
        Ok(())
    }

    fn push_cubic(&mut self, cp1: Point, cp2: Point, end: Point) {
        self.begin_segment();
        self.push_point(cp1, PointKind::Control);
        self.push_point(cp2, PointKind::Control);
        self.push_point(end, PointKind::CurveEnd);
        self.commands.push(PathCmd::CubicTo);
        self.current = end;
        self.prev_cubic_ctrl = Some(cp2);
        self.prev_quad_ctrl = None;
    }

    fn cubic(&mut self, relative: bool) -> UndulaResult<()> {
        let cp1 = self.pair(relative)?;
        let cp2 = self.pair(relative)?;
        let end = self.pair(relative)?;
        self.push_cubic(cp1, cp2, end);
        Ok(())
    }

    fn smooth_cubic(&mut self, relative: bool) -> UndulaResult<()> {
        let cp1 = self.reflect(self.prev_cubic_ctrl);
        let cp2 = self.pair(relative)?;
        let end = self.pair(relative)?;
        self.push_cubic(cp1, cp2, end);
        Ok(())
    }

    fn quadratic(&mut self, relative: bool) -> UndulaResult<()> {
        let qc = self.pair(relative)?;
        let end = self.pair(relative)?;
        self.push_elevated_quadratic(qc, end);
        Ok(())
    }

    fn smooth_quadratic(&mut self, relative: bool) -> UndulaResult<()> {
        let qc = self.reflect(self.prev_quad_ctrl);
        let end = self.pair(relative)?;
        self.push_elevated_quadratic(qc, end);
        Ok(())
    }

    /// Degree-elevate a quadratic control point into a cubic pair.
    fn push_elevated_quadratic(&mut self, qc: Point, end: Point) {
        let p0 = self.current;
        let cp1 = Point::new(
            p0.x + (qc.x - p0.x) * (2.0 / 3.0),
            p0.y + (qc.y - p0.y) * (2.0 / 3.0),
        );
        let cp2 = Point::new(
            end.x + (qc.x - end.x) * (2.0 / 3.0),
            end.y + (qc.y - end.y) * (2.0 / 3.0),
        );
        self.push_cubic(cp1, cp2, end);
        self.prev_quad_ctrl = Some(qc);
    }

    /// Reflect the previous control point about the current point; if the
    /// previous command was not a matching curve, the reflection collapses to
    /// the current point.
    fn reflect(&self, prev: Option<Point>) -> Point {
        match prev {
            Some(c) => Point::new(
                2.0 * self.current.x - c.x,
                2.0 * self.current.y - c.y,
            ),
            None => self.current,
        }
    }

    fn close(&mut self) {
        self.commands.push(PathCmd::ClosePath);
        self.current = self.subpath_start;
        self.finish_subpath(true);
        self.subpath_begin_idx = self.points.len();
        self.pending_restart = true;
        self.clear_ctrl();
    }

    fn finish_subpath(&mut self, closed: bool) {
        let range = self.subpath_begin_idx..self.points.len();
        if !range.is_empty() {
            self.subpaths.push((range, closed));
        }
    }

    fn push_point(&mut self, p: Point, kind: PointKind) {
        self.points.push(p);
        self.kinds.push(kind);
    }

    fn clear_ctrl(&mut self) {
        self.prev_cubic_ctrl = None;
        self.prev_quad_ctrl = None;
    }
}
