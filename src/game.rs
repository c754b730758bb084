//! Board engine: preview row, drops, swaps, cascade resolution, scoring.

/// Board height in rows. Row 0 is the spawn/overflow row, `ROWS - 1` the floor.
pub const ROWS: usize = 10;

/// Board width in columns.
pub const COLS: usize = 8;

/// Rows pre-filled at the bottom of a fresh board.
const SEED_ROWS: usize = 5;

/// Minimum run length that counts as a match.
const MIN_RUN: usize = 3;

/// Cap on resolution passes after a single mutation.
const MAX_CASCADE_PASSES: usize = ROWS * COLS;

/// Preview fill count from which the strip draws in its warning style.
pub const PREVIEW_WARN_FILL: usize = 6;

/// Block colours. The index pairs with theme.block_color() and the
/// colorblind glyph table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockColor {
    Red,
    Blue,
    Green,
    Yellow,
    Violet,
    Cyan,
}

impl BlockColor {
    pub const ALL: [Self; 6] = [
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Yellow,
        Self::Violet,
        Self::Cyan,
    ];

    /// Colour index 0..6.
    pub fn index(self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Blue => 1,
            Self::Green => 2,
            Self::Yellow => 3,
            Self::Violet => 4,
            Self::Cyan => 5,
        }
    }
}

/// Identity-bearing block: id and colour never change, only position does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub id: u32,
    pub color: BlockColor,
    pub row: usize,
    pub col: usize,
}

/// Deterministic block-colour generator (LCG).
#[derive(Debug, Clone)]
struct BlockRng {
    state: u32,
}

impl BlockRng {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_rand(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        self.state >> 16
    }

    fn next_color(&mut self) -> BlockColor {
        BlockColor::ALL[(self.next_rand() as usize) % BlockColor::ALL.len()]
    }
}

/// Fixed grid of cells; `cells[row][col]`, row 0 on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Block>; COLS]; ROWS],
}

impl Board {
    fn new() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Block> {
        if row >= ROWS || col >= COLS {
            return None;
        }
        self.cells[row][col]
    }

    /// Writes a block at (row, col), retagging its coordinates to match.
    fn place(&mut self, row: usize, col: usize, mut block: Block) {
        block.row = row;
        block.col = col;
        self.cells[row][col] = Some(block);
    }

    fn take(&mut self, row: usize, col: usize) -> Option<Block> {
        self.cells[row][col].take()
    }

    fn clear(&mut self, row: usize, col: usize) {
        self.cells[row][col] = None;
    }

    /// A block is settled when every cell beneath it down to the floor is
    /// occupied. Only settled blocks can match.
    pub fn is_settled(&self, row: usize, col: usize) -> bool {
        (row + 1..ROWS).all(|r| self.cells[r][col].is_some())
    }

    pub fn top_row_occupied(&self) -> bool {
        self.cells[0].iter().any(|cell| cell.is_some())
    }

    /// One gravity pass: per column, bottom-to-top, each block with an empty
    /// cell directly beneath slides down one. A block above two gaps takes
    /// two passes. Returns true if anything moved.
    fn gravity_step(&mut self) -> bool {
        let mut moved = false;
        for col in 0..COLS {
            for row in (0..ROWS - 1).rev() {
                if self.cells[row + 1][col].is_none() {
                    if let Some(block) = self.cells[row][col].take() {
                        self.place(row + 1, col, block);
                        moved = true;
                    }
                }
            }
        }
        moved
    }

    /// Scans all rows and columns for runs of `MIN_RUN`+ equal-coloured
    /// settled blocks. Horizontal and vertical runs are detected
    /// independently and their cells unioned; a cell can sit in both at
    /// once. `cells[0]` is the head of the first detected run.
    fn find_runs(&self) -> MatchScan {
        fn flush(
            scan: &mut MatchScan,
            seen: &mut [[bool; COLS]; ROWS],
            run: impl Iterator<Item = (usize, usize)>,
            len: usize,
        ) {
            if len < MIN_RUN {
                return;
            }
            scan.longest = scan.longest.max(len);
            for (row, col) in run {
                if !seen[row][col] {
                    seen[row][col] = true;
                    scan.cells.push((row, col));
                }
            }
        }

        let mut scan = MatchScan::default();
        let mut seen = [[false; COLS]; ROWS];

        for row in 0..ROWS {
            let mut run_color: Option<BlockColor> = None;
            let mut run_start = 0;
            let mut run_len = 0;
            for col in 0..=COLS {
                let color = if col < COLS {
                    self.cells[row][col]
                        .filter(|_| self.is_settled(row, col))
                        .map(|b| b.color)
                } else {
                    None
                };
                match (run_color, color) {
                    (Some(rc), Some(c)) if rc == c => run_len += 1,
                    _ => {
                        flush(
                            &mut scan,
                            &mut seen,
                            (run_start..run_start + run_len).map(|c| (row, c)),
                            run_len,
                        );
                        run_color = color;
                        run_start = col;
                        run_len = usize::from(color.is_some());
                    }
                }
            }
        }

        for col in 0..COLS {
            let mut run_color: Option<BlockColor> = None;
            let mut run_start = 0;
            let mut run_len = 0;
            for row in 0..=ROWS {
                let color = if row < ROWS {
                    self.cells[row][col]
                        .filter(|_| self.is_settled(row, col))
                        .map(|b| b.color)
                } else {
                    None
                };
                match (run_color, color) {
                    (Some(rc), Some(c)) if rc == c => run_len += 1,
                    _ => {
                        flush(
                            &mut scan,
                            &mut seen,
                            (run_start..run_start + run_len).map(|r| (r, col)),
                            run_len,
                        );
                        run_color = color;
                        run_start = row;
                        run_len = usize::from(color.is_some());
                    }
                }
            }
        }

        scan
    }
}

/// One scan's outcome: unioned matched cells and the longest single run.
#[derive(Debug, Default)]
struct MatchScan {
    cells: Vec<(usize, usize)>,
    longest: usize,
}

/// Blocks queued to enter the board on the next drop. Slots fill
/// left-to-right, one per tick; `slots[..fill]` are always occupied.
#[derive(Debug, Clone)]
pub struct PreviewRow {
    slots: [Option<Block>; COLS],
    fill: usize,
}

impl PreviewRow {
    fn new() -> Self {
        Self {
            slots: [None; COLS],
            fill: 0,
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.fill == COLS
    }

    #[inline]
    pub fn filled(&self) -> usize {
        self.fill
    }

    pub fn slot(&self, col: usize) -> Option<Block> {
        self.slots.get(col).copied().flatten()
    }

    fn push(&mut self, block: Block) {
        if self.fill < COLS {
            self.slots[self.fill] = Some(block);
            self.fill += 1;
        }
    }

    fn take(&mut self, col: usize) -> Option<Block> {
        self.slots[col].take()
    }

    fn reset(&mut self) {
        self.slots = [None; COLS];
        self.fill = 0;
    }
}

/// Discrete engine events, drained by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// One resolution pass cleared `cells`. `chain` is the combo value the
    /// bonus was computed from; `cells[0]` anchors floating score text.
    Match {
        points: u32,
        chain: u32,
        cells: Vec<(usize, usize)>,
    },
    LevelUp {
        level: u32,
    },
    GameOver,
}

/// Read-only view of a session, rebuilt per frame for drawing.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub board: [[Option<BlockColor>; COLS]; ROWS],
    pub preview: [Option<BlockColor>; COLS],
    pub preview_fill: usize,
    pub score: u32,
    pub level: u32,
    pub level_progress: u32,
    pub level_threshold: u32,
    pub combo_chain: u32,
    pub paused: bool,
    pub game_over: bool,
}

/// One game session. All board and session state lives behind this API;
/// the presentation layer reads snapshots, drains events, and calls
/// `start`/`tick`/`swap`/`set_paused`.
#[derive(Debug)]
pub struct GameState {
    board: Board,
    preview: PreviewRow,
    rng: BlockRng,
    next_block_id: u32,
    score: u32,
    level: u32,
    level_progress: u32,
    combo_chain: u32,
    started: bool,
    paused: bool,
    game_over: bool,
    events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(seed: u32) -> Self {
        Self {
            board: Board::new(),
            preview: PreviewRow::new(),
            rng: BlockRng::new(seed),
            next_block_id: 0,
            score: 0,
            level: 1,
            level_progress: 0,
            combo_chain: 0,
            started: false,
            paused: false,
            game_over: false,
            events: Vec::new(),
        }
    }

    /// Starts a fresh session: bottom `SEED_ROWS` rows populated, top rows
    /// empty, score/level/combo reset. Each seeded block is redrawn until
    /// it completes no run with the neighbours already placed to its left
    /// or above, so a new board never contains a match.
    pub fn start(&mut self, start_level: u32) {
        self.board = Board::new();
        self.preview = PreviewRow::new();
        self.score = 0;
        self.level = start_level.max(1);
        self.level_progress = 0;
        self.combo_chain = 0;
        self.started = true;
        self.paused = false;
        self.game_over = false;
        self.events.clear();

        for row in ROWS - SEED_ROWS..ROWS {
            for col in 0..COLS {
                let block = self.seed_block(row, col);
                self.board.place(row, col, block);
            }
        }
    }

    fn seed_block(&mut self, row: usize, col: usize) -> Block {
        loop {
            let block = self.generate_block(row, col);
            if !self.seed_collides(row, col, block.color) {
                return block;
            }
        }
    }

    fn seed_collides(&self, row: usize, col: usize, color: BlockColor) -> bool {
        let left_pair = col >= 2
            && self.color_at(row, col - 1) == Some(color)
            && self.color_at(row, col - 2) == Some(color);
        // Two seeded rows must already lie above for the vertical check.
        let above_pair = row >= ROWS - SEED_ROWS + 2
            && self.color_at(row - 1, col) == Some(color)
            && self.color_at(row - 2, col) == Some(color);
        left_pair || above_pair
    }

    fn color_at(&self, row: usize, col: usize) -> Option<BlockColor> {
        self.board.get(row, col).map(|b| b.color)
    }

    fn generate_block(&mut self, row: usize, col: usize) -> Block {
        let id = self.next_block_id;
        self.next_block_id = self.next_block_id.wrapping_add(1);
        Block {
            id,
            color: self.rng.next_color(),
            row,
            col,
        }
    }

    /// One timer tick: fills the next preview slot, or performs the drop
    /// when the preview row is already full. Filling never touches the
    /// board.
    pub fn tick(&mut self) {
        if !self.started || self.paused || self.game_over {
            return;
        }
        if self.preview.is_full() {
            self.attempt_drop();
        } else {
            let col = self.preview.filled();
            let block = self.generate_block(0, col);
            self.preview.push(block);
        }
    }

    /// Drops the full preview row into the top board row. Checked before
    /// any write: an occupied top-row cell ends the game and leaves board
    /// and preview exactly as they were.
    fn attempt_drop(&mut self) {
        if self.board.top_row_occupied() {
            self.game_over = true;
            self.events.push(GameEvent::GameOver);
            return;
        }
        for col in 0..COLS {
            if let Some(block) = self.preview.take(col) {
                self.board.place(0, col, block);
            }
        }
        self.preview.reset();
        self.resolve_cascade();
    }

    /// Exchanges the contents of two cells; either may be empty. A swap
    /// that immediately produces a match starts the combo chain at 1, one
    /// that does not resets it to 0 and leaves the blocks where they
    /// landed. No-op while paused, over, or before start.
    pub fn swap(&mut self, a: (usize, usize), b: (usize, usize)) {
        if !self.started || self.paused || self.game_over {
            return;
        }
        if a.0 >= ROWS || a.1 >= COLS || b.0 >= ROWS || b.1 >= COLS {
            return;
        }

        let block_a = self.board.take(a.0, a.1);
        let block_b = self.board.take(b.0, b.1);
        if let Some(block) = block_b {
            self.board.place(a.0, a.1, block);
        }
        if let Some(block) = block_a {
            self.board.place(b.0, b.1, block);
        }

        let scan = self.board.find_runs();
        if scan.cells.is_empty() {
            self.combo_chain = 0;
        } else {
            self.apply_match(&scan);
            self.combo_chain = 1;
        }
        self.resolve_cascade();
    }

    /// Pause gate: while set, ticks and swaps are ignored and the session
    /// keeps its exact state for resume.
    pub fn set_paused(&mut self, paused: bool) {
        if self.started && !self.game_over {
            self.paused = paused;
        }
    }

    /// Settles the board after a mutation: repeated single-gap gravity
    /// passes, a settled-run scan after each, clearing and scoring until
    /// nothing moves and nothing matches.
    fn resolve_cascade(&mut self) {
        for _ in 0..MAX_CASCADE_PASSES {
            let moved = self.board.gravity_step();
            let scan = self.board.find_runs();
            if scan.cells.is_empty() {
                if !moved {
                    break;
                }
                continue;
            }
            self.apply_match(&scan);
            self.combo_chain += 1;
        }
    }

    /// Scores and clears one pass's matched cells. The bonus uses the
    /// chain value as it stands; callers update the chain afterwards.
    fn apply_match(&mut self, scan: &MatchScan) {
        let points = match_points(scan.cells.len(), scan.longest, self.combo_chain);
        for &(row, col) in &scan.cells {
            self.board.clear(row, col);
        }
        self.score += points;
        self.level_progress += points;
        self.events.push(GameEvent::Match {
            points,
            chain: self.combo_chain,
            cells: scan.cells.clone(),
        });
        if self.level_progress >= level_threshold(self.level) {
            self.level += 1;
            self.level_progress = 0;
            self.events.push(GameEvent::LevelUp { level: self.level });
        }
    }

    #[inline]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn combo_chain(&self) -> u32 {
        self.combo_chain
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn block_at(&self, row: usize, col: usize) -> Option<Block> {
        self.board.get(row, col)
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut board = [[None; COLS]; ROWS];
        for (row, colors) in board.iter_mut().enumerate() {
            for (col, slot) in colors.iter_mut().enumerate() {
                *slot = self.board.get(row, col).map(|b| b.color);
            }
        }
        let mut preview = [None; COLS];
        for (col, slot) in preview.iter_mut().enumerate() {
            *slot = self.preview.slot(col).map(|b| b.color);
        }
        Snapshot {
            board,
            preview,
            preview_fill: self.preview.filled(),
            score: self.score,
            level: self.level,
            level_progress: self.level_progress,
            level_threshold: level_threshold(self.level),
            combo_chain: self.combo_chain,
            paused: self.paused,
            game_over: self.game_over,
        }
    }

    /// Drains events accumulated since the last call, in emission order.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Preview tick interval for a level, in milliseconds. Ramps 1200 down to
/// 400 over levels 1..5, to 200 over 5..10, then 24 ms per level down to
/// the 60 ms floor at level 15.
pub fn tick_interval_ms(level: u32) -> u64 {
    let level = level.max(1);
    if level < 5 {
        1200 - u64::from(level - 1) * 200
    } else if level < 10 {
        400 - u64::from(level - 5) * 50
    } else if level < 15 {
        180 - u64::from(level - 10) * 24
    } else {
        60
    }
}

/// Level-progress points needed to leave `level`.
pub fn level_threshold(level: u32) -> u32 {
    1000 + level * 250
}

/// Points for one resolution pass: unioned cell count times 10, a size
/// multiplier from the longest single run (a 4-run doubles, 5+ triples),
/// and a half-step combo bonus, floored.
pub fn match_points(cell_count: usize, longest_run: usize, chain: u32) -> u32 {
    let multiplier: u32 = if longest_run >= 5 {
        3
    } else if longest_run == 4 {
        2
    } else {
        1
    };
    let bonus = if chain == 0 {
        1.0
    } else {
        f64::from(chain) * 0.5 + 1.0
    };
    (f64::from(cell_count as u32 * 10 * multiplier) * bonus) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: u32, color: BlockColor, row: usize, col: usize) -> Block {
        Block {
            id,
            color,
            row,
            col,
        }
    }

    /// Started session with every seeded block removed, for crafted
    /// positions.
    fn empty_session() -> GameState {
        let mut game = GameState::new(7);
        game.start(1);
        for row in 0..ROWS {
            for col in 0..COLS {
                game.board.clear(row, col);
            }
        }
        game.take_events();
        game
    }

    fn block_count(game: &GameState) -> usize {
        (0..ROWS)
            .flat_map(|r| (0..COLS).map(move |c| (r, c)))
            .filter(|&(r, c)| game.block_at(r, c).is_some())
            .count()
    }

    fn assert_coords_consistent(game: &GameState) {
        for row in 0..ROWS {
            for col in 0..COLS {
                if let Some(b) = game.block_at(row, col) {
                    assert_eq!((b.row, b.col), (row, col), "block {} mistagged", b.id);
                }
            }
        }
    }

    #[test]
    fn seeded_boards_have_no_initial_runs() {
        for seed in 0..40 {
            let mut game = GameState::new(seed);
            game.start(1);
            let scan = game.board.find_runs();
            assert!(
                scan.cells.is_empty(),
                "seed {seed} produced a match at start: {:?}",
                scan.cells
            );
            for col in 0..COLS {
                for row in 0..ROWS - SEED_ROWS {
                    assert!(game.block_at(row, col).is_none());
                }
                for row in ROWS - SEED_ROWS..ROWS {
                    assert!(game.block_at(row, col).is_some());
                }
            }
            assert_coords_consistent(&game);
        }
    }

    #[test]
    fn preview_fills_left_to_right_without_touching_board() {
        let mut game = GameState::new(3);
        game.start(1);
        let board_before = game.board.clone();

        for expected_fill in 1..=COLS {
            game.tick();
            assert_eq!(game.preview.filled(), expected_fill);
            for col in 0..expected_fill {
                assert!(game.preview.slot(col).is_some());
            }
            for col in expected_fill..COLS {
                assert!(game.preview.slot(col).is_none());
            }
        }
        assert!(game.preview.is_full());
        assert_eq!(game.board, board_before);

        // The next tick is the drop: preview empties, board gains the row.
        game.tick();
        assert_eq!(game.preview.filled(), 0);
        assert!((0..COLS).all(|col| game.preview.slot(col).is_none()));
        assert!(!game.is_game_over());
        assert_coords_consistent(&game);
    }

    #[test]
    fn drop_on_empty_top_row_never_ends_game() {
        let mut game = empty_session();
        for _ in 0..=COLS {
            game.tick();
        }
        assert!(!game.is_game_over());
        assert_eq!(game.preview.filled(), 0);
    }

    #[test]
    fn drop_on_occupied_top_row_ends_game_and_keeps_board() {
        let mut game = empty_session();
        game.board.place(0, 3, block(900, BlockColor::Red, 0, 3));
        for _ in 0..COLS {
            game.tick();
        }
        let board_before = game.board.clone();

        game.tick();
        assert!(game.is_game_over());
        assert_eq!(game.board, board_before);
        // Preview is retained for the final render.
        assert!(game.preview.is_full());
        assert_eq!(game.take_events(), vec![GameEvent::GameOver]);

        // Terminal state: further ticks and swaps change nothing.
        game.tick();
        game.swap((9, 0), (9, 1));
        assert_eq!(game.board, board_before);
        assert!(game.take_events().is_empty());
    }

    #[test]
    fn drop_preserves_block_identity() {
        let mut game = empty_session();
        let colors = [
            BlockColor::Red,
            BlockColor::Blue,
            BlockColor::Red,
            BlockColor::Blue,
            BlockColor::Red,
            BlockColor::Blue,
            BlockColor::Red,
            BlockColor::Blue,
        ];
        for (col, &color) in colors.iter().enumerate() {
            game.preview.push(block(100 + col as u32, color, 0, col));
        }
        assert!(game.preview.is_full());

        game.tick();
        assert!(game.take_events().is_empty());
        for (col, &color) in colors.iter().enumerate() {
            let landed = game.block_at(ROWS - 1, col);
            assert_eq!(landed.map(|b| b.id), Some(100 + col as u32));
            assert_eq!(landed.map(|b| b.color), Some(color));
        }
        assert_eq!(block_count(&game), COLS);
        assert_coords_consistent(&game);
    }

    #[test]
    fn cascade_is_idempotent_at_fixpoint() {
        let mut game = empty_session();
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));
        game.board.place(9, 1, block(2, BlockColor::Blue, 9, 1));
        game.board.place(8, 0, block(3, BlockColor::Blue, 8, 0));
        game.combo_chain = 2;
        let board_before = game.board.clone();

        game.resolve_cascade();
        assert_eq!(game.board, board_before);
        assert_eq!(game.combo_chain, 2);
        assert!(game.take_events().is_empty());
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn swap_completing_three_run_scores_thirty() {
        let mut game = empty_session();
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));
        game.board.place(9, 1, block(2, BlockColor::Red, 9, 1));
        game.board.place(9, 2, block(3, BlockColor::Blue, 9, 2));
        game.board.place(8, 2, block(4, BlockColor::Red, 8, 2));

        game.swap((8, 2), (9, 2));
        assert_eq!(game.score(), 30);
        assert_eq!(game.combo_chain(), 1);
        let events = game.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            GameEvent::Match {
                points,
                chain,
                cells,
            } => {
                assert_eq!(*points, 30);
                assert_eq!(*chain, 0);
                assert_eq!(cells.len(), 3);
            }
            other => panic!("expected a match event, got {other:?}"),
        }
        // The displaced blue block fell back onto the floor.
        assert_eq!(
            game.block_at(9, 2).map(|b| (b.id, b.color)),
            Some((3, BlockColor::Blue))
        );
        assert_coords_consistent(&game);
    }

    #[test]
    fn swap_completing_four_run_scores_eighty() {
        let mut game = empty_session();
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));
        game.board.place(9, 1, block(2, BlockColor::Red, 9, 1));
        game.board.place(9, 3, block(3, BlockColor::Red, 9, 3));
        game.board.place(9, 2, block(4, BlockColor::Blue, 9, 2));
        game.board.place(8, 2, block(5, BlockColor::Red, 8, 2));

        game.swap((8, 2), (9, 2));
        assert_eq!(game.score(), 80);
        assert_eq!(game.combo_chain(), 1);
    }

    #[test]
    fn swap_match_scores_with_the_standing_chain() {
        let mut game = empty_session();
        game.combo_chain = 2;
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));
        game.board.place(9, 1, block(2, BlockColor::Red, 9, 1));
        game.board.place(9, 2, block(3, BlockColor::Blue, 9, 2));
        game.board.place(8, 2, block(4, BlockColor::Red, 8, 2));

        game.swap((8, 2), (9, 2));
        // 3 cells x 10 x 1 x (2 * 0.5 + 1) = 60, then the chain restarts.
        assert_eq!(game.score(), 60);
        assert_eq!(game.combo_chain(), 1);
        match game.take_events().first() {
            Some(GameEvent::Match { points, chain, .. }) => {
                assert_eq!(*points, 60);
                assert_eq!(*chain, 2);
            }
            other => panic!("expected a match event, got {other:?}"),
        }
    }

    #[test]
    fn swap_without_match_keeps_positions_and_resets_chain() {
        let mut game = empty_session();
        game.combo_chain = 3;
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));
        game.board.place(9, 1, block(2, BlockColor::Blue, 9, 1));

        game.swap((9, 0), (9, 1));
        assert_eq!(
            game.block_at(9, 0).map(|b| (b.id, b.color)),
            Some((2, BlockColor::Blue))
        );
        assert_eq!(
            game.block_at(9, 1).map(|b| (b.id, b.color)),
            Some((1, BlockColor::Red))
        );
        assert_eq!(game.combo_chain(), 0);
        assert!(game.take_events().is_empty());
        assert_coords_consistent(&game);
    }

    #[test]
    fn swap_into_empty_cell_moves_the_block() {
        let mut game = empty_session();
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));

        game.swap((9, 0), (9, 4));
        assert!(game.block_at(9, 0).is_none());
        assert_eq!(game.block_at(9, 4).map(|b| b.id), Some(1));
        assert_eq!(game.combo_chain(), 0);
        assert_coords_consistent(&game);
    }

    #[test]
    fn swap_into_midair_lets_the_block_fall() {
        let mut game = empty_session();
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));

        game.swap((9, 0), (4, 5));
        assert!(game.block_at(4, 5).is_none());
        assert_eq!(game.block_at(9, 5).map(|b| b.id), Some(1));
        assert_coords_consistent(&game);
    }

    #[test]
    fn crossing_runs_share_a_cell_and_union_their_points() {
        let mut game = empty_session();
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));
        game.board.place(9, 1, block(2, BlockColor::Red, 9, 1));
        game.board.place(9, 2, block(3, BlockColor::Blue, 9, 2));
        game.board.place(8, 2, block(4, BlockColor::Red, 8, 2));
        game.board.place(7, 2, block(5, BlockColor::Red, 7, 2));
        game.board.place(9, 3, block(6, BlockColor::Red, 9, 3));

        // Brings red to (9,2): a horizontal and a vertical 3-run crossing
        // there. Five distinct cells, longest single run 3.
        game.swap((9, 3), (9, 2));
        assert_eq!(game.score(), 50);
        match game.take_events().first() {
            Some(GameEvent::Match { points, cells, .. }) => {
                assert_eq!(*points, 50);
                assert_eq!(cells.len(), 5);
            }
            other => panic!("expected a match event, got {other:?}"),
        }
    }

    #[test]
    fn simultaneous_runs_clear_in_one_pass() {
        let mut game = empty_session();
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));
        game.board.place(9, 1, block(2, BlockColor::Red, 9, 1));
        game.board.place(9, 2, block(3, BlockColor::Blue, 9, 2));
        game.board.place(8, 0, block(4, BlockColor::Blue, 8, 0));
        game.board.place(8, 1, block(5, BlockColor::Blue, 8, 1));
        game.board.place(8, 2, block(6, BlockColor::Red, 8, 2));

        // The swap completes a red row and a blue row at once: one pass,
        // six cells, longest run 3, single chain step.
        game.swap((8, 2), (9, 2));
        assert_eq!(game.score(), 60);
        assert_eq!(game.combo_chain(), 1);
        assert_eq!(block_count(&game), 0);
        let events = game.take_events();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn cascade_chains_increment_the_combo() {
        let mut game = empty_session();
        // Support rows so everything above sits settled.
        let filler = [
            (9, 3, BlockColor::Green),
            (9, 4, BlockColor::Yellow),
            (9, 5, BlockColor::Blue),
            (9, 6, BlockColor::Green),
            (8, 3, BlockColor::Yellow),
            (8, 4, BlockColor::Green),
            (8, 5, BlockColor::Blue),
            (8, 6, BlockColor::Yellow),
        ];
        for (i, &(row, col, color)) in filler.iter().enumerate() {
            game.board.place(row, col, block(10 + i as u32, color, row, col));
        }
        game.board.place(7, 3, block(30, BlockColor::Red, 7, 3));
        game.board.place(7, 4, block(31, BlockColor::Red, 7, 4));
        game.board.place(7, 5, block(32, BlockColor::Cyan, 7, 5));
        game.board.place(7, 6, block(33, BlockColor::Red, 7, 6));
        game.board.place(6, 5, block(34, BlockColor::Blue, 6, 5));
        game.board.place(6, 6, block(35, BlockColor::Red, 6, 6));
        assert!(game.board.find_runs().cells.is_empty());

        // The swap completes a red 4-run on row 7; the blue block then
        // falls into a vertical blue 3-run on column 5.
        game.swap((6, 6), (7, 5));
        let events = game.take_events();
        assert_eq!(events.len(), 2);
        match &events[0] {
            GameEvent::Match {
                points,
                chain,
                cells,
            } => {
                assert_eq!(*points, 80);
                assert_eq!(*chain, 0);
                assert_eq!(cells.len(), 4);
            }
            other => panic!("expected a match event, got {other:?}"),
        }
        match &events[1] {
            GameEvent::Match {
                points,
                chain,
                cells,
            } => {
                // 3 x 10 x 1 x 1.5 with the chain at 1.
                assert_eq!(*points, 45);
                assert_eq!(*chain, 1);
                assert_eq!(cells.len(), 3);
            }
            other => panic!("expected a match event, got {other:?}"),
        }
        assert_eq!(game.score(), 125);
        assert_eq!(game.combo_chain(), 2);
        assert_coords_consistent(&game);
    }

    #[test]
    fn chain_persists_across_drops() {
        let mut game = empty_session();
        game.combo_chain = 2;
        for col in 0..COLS {
            let color = if col % 2 == 0 {
                BlockColor::Red
            } else {
                BlockColor::Blue
            };
            game.preview.push(block(200 + col as u32, color, 0, col));
        }
        game.tick();
        assert_eq!(game.combo_chain(), 2);
    }

    #[test]
    fn level_up_at_threshold_resets_progress() {
        let mut game = empty_session();
        game.level_progress = 1230;
        game.board.place(9, 0, block(1, BlockColor::Red, 9, 0));
        game.board.place(9, 1, block(2, BlockColor::Red, 9, 1));
        game.board.place(9, 2, block(3, BlockColor::Blue, 9, 2));
        game.board.place(8, 2, block(4, BlockColor::Red, 8, 2));

        game.swap((8, 2), (9, 2));
        let snapshot = game.snapshot();
        assert_eq!(snapshot.level, 2);
        assert_eq!(snapshot.level_progress, 0);
        assert_eq!(snapshot.level_threshold, level_threshold(2));
        assert_eq!(tick_interval_ms(snapshot.level), 1000);
        let events = game.take_events();
        assert!(events.contains(&GameEvent::LevelUp { level: 2 }));
    }

    #[test]
    fn engine_ignores_input_before_start_and_while_paused() {
        let mut game = GameState::new(5);
        game.tick();
        game.swap((9, 0), (9, 1));
        assert_eq!(game.preview.filled(), 0);
        assert_eq!(block_count(&game), 0);

        game.start(1);
        game.set_paused(true);
        game.tick();
        assert_eq!(game.preview.filled(), 0);
        let before = game.board.clone();
        game.swap((ROWS - 1, 0), (ROWS - 1, 1));
        assert_eq!(game.board, before);

        game.set_paused(false);
        game.tick();
        assert_eq!(game.preview.filled(), 1);
    }

    #[test]
    fn snapshot_mirrors_session_state() {
        let mut game = GameState::new(11);
        game.start(3);
        game.tick();
        game.tick();
        let snapshot = game.snapshot();
        assert_eq!(snapshot.level, 3);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.preview_fill, 2);
        assert!(snapshot.preview[0].is_some());
        assert!(snapshot.preview[2].is_none());
        assert!(!snapshot.paused);
        assert!(!snapshot.game_over);
        for row in 0..ROWS {
            for col in 0..COLS {
                assert_eq!(
                    snapshot.board[row][col],
                    game.block_at(row, col).map(|b| b.color)
                );
            }
        }
    }

    #[test]
    fn tick_interval_schedule() {
        let expected = [
            (1, 1200),
            (2, 1000),
            (3, 800),
            (4, 600),
            (5, 400),
            (6, 350),
            (9, 200),
            (10, 180),
            (11, 156),
            (12, 132),
            (14, 84),
            (15, 60),
            (20, 60),
            (99, 60),
        ];
        for (level, ms) in expected {
            assert_eq!(tick_interval_ms(level), ms, "level {level}");
        }
    }

    #[test]
    fn level_threshold_formula() {
        assert_eq!(level_threshold(1), 1250);
        assert_eq!(level_threshold(2), 1500);
        assert_eq!(level_threshold(4), 2000);
    }

    #[test]
    fn match_points_table() {
        assert_eq!(match_points(3, 3, 0), 30);
        assert_eq!(match_points(4, 4, 0), 80);
        assert_eq!(match_points(3, 3, 2), 60);
        assert_eq!(match_points(5, 5, 0), 150);
        // Union of crossing 3-runs: cell count drives the base, the
        // multiplier stays at the longest single run.
        assert_eq!(match_points(6, 3, 0), 60);
        assert_eq!(match_points(5, 4, 1), 150);
    }
}
