use crate::layout::{month_grid, MonthGrid};
use crate::refresh::{RefreshSchedule, Trigger};
use crate::render::{updated_label, Mode, RenderSink, TerminalSink};
use crate::store::StoreDir;
use crate::summary::CompactSummary;
use crossterm::event::{poll, read, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::Backend, Terminal};
use std::io::{self, Write};
use std::time::SystemTime;
use time::{Date, OffsetDateTime, UtcOffset};

/// The interactive widget: keeps a month grid on screen and rebuilds it from
/// the store whenever the refresh schedule says so
#[derive(Debug)]
pub(crate) struct App<B: Backend> {
    sink: TerminalSink<B>,
    store: StoreDir,
    schedule: RefreshSchedule,
    /// Local UTC offset, fixed at startup
    offset: UtcOffset,
    /// Show this date as "today" instead of the real one
    pinned: Option<Date>,
    /// Modification times of the two store files as of the last refresh
    seen_modified: [Option<SystemTime>; 2],
    quitting: bool,
}

impl<B: Backend> App<B> {
    pub(crate) fn new(
        terminal: Terminal<B>,
        store: StoreDir,
        schedule: RefreshSchedule,
        offset: UtcOffset,
    ) -> App<B> {
        App {
            sink: TerminalSink::new(terminal),
            store,
            schedule,
            offset,
            pinned: None,
            seen_modified: [None, None],
            quitting: false,
        }
    }

    pub(crate) fn pin_date(mut self, date: Date) -> App<B> {
        self.pinned = Some(date);
        self
    }

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    fn today(&self, now: OffsetDateTime) -> Date {
        self.pinned.unwrap_or_else(|| now.date())
    }

    /// Rebuild the grid and compact summary from the store.  On failure the
    /// previous screen is left exactly as it was and `None` is returned; the
    /// next trigger tries again from scratch.
    fn refresh(&mut self, trigger: Trigger, now: OffsetDateTime) -> Option<MonthGrid> {
        let today = self.today(now);
        log::info!("refreshing for {today} ({trigger:?})");
        // Sample the mtime before reading so that a write racing the load
        // shows up as a change on the next check
        let modified = self.store.modified();
        let r = self.store.load_events();
        self.schedule.mark_done(trigger, now);
        self.seen_modified = modified;
        match r {
            Ok(prefs) => {
                let grid = month_grid(today, &prefs);
                let screen = self.sink.screen_mut();
                screen.compact = Some(CompactSummary::new(today, &prefs));
                screen.updated = updated_label(now);
                Some(grid)
            }
            Err(e) => {
                log::warn!("keeping previous grid: {:#}", anyhow::Error::new(e));
                None
            }
        }
    }

    fn check_store(&mut self) {
        // A sync request only touches the sync file, but still warrants a
        // redraw
        let modified = self.store.modified();
        if modified != self.seen_modified {
            log::debug!("store changed on disk");
            self.seen_modified = modified;
            self.schedule.request(Trigger::StoreChanged);
        }
    }

    // Returns `false` if the user pressed an invalid key
    fn handle_key(&mut self, key: KeyCode) -> bool {
        let screen = self.sink.screen_mut();
        if screen.helping {
            screen.helping = false;
            return true;
        }
        match key {
            KeyCode::Char('r') => {
                self.schedule.request(Trigger::Explicit);
                true
            }
            KeyCode::Char('c') => {
                screen.mode = match screen.mode {
                    Mode::Month => Mode::Compact,
                    Mode::Compact => Mode::Month,
                };
                true
            }
            KeyCode::Char('?') => {
                screen.helping = true;
                true
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.quitting = true;
                true
            }
            _ => false,
        }
    }

    fn beep(&self) -> io::Result<()> {
        io::stdout().write_all(b"\x07")
    }
}

impl<B: Backend> App<B>
where
    io::Error: From<B::Error>,
{
    pub(crate) fn run(mut self) -> io::Result<()> {
        log::info!(
            "starting; refreshing every {} minute(s)",
            self.schedule.interval().whole_minutes()
        );
        while !self.quitting {
            self.check_store();
            let now = self.now();
            if let Some(trigger) = self.schedule.due(now) {
                if let Some(grid) = self.refresh(trigger, now) {
                    self.sink.render(&grid)?;
                    continue;
                }
            }
            self.sink.redraw()?;
            self.handle_input(now)?;
        }
        Ok(())
    }

    fn handle_input(&mut self, now: OffsetDateTime) -> io::Result<()> {
        if !poll(self.schedule.timeout(now))? {
            return Ok(());
        }
        let normal_modifiers = KeyModifiers::NONE | KeyModifiers::SHIFT;
        if let Some(KeyEvent {
            code, modifiers, ..
        }) = read()?.as_key_press_event()
        {
            if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
                self.quitting = true;
            } else if !normal_modifiers.contains(modifiers) || !self.handle_key(code) {
                self.beep()?;
            }
        }
        // else: Redraw on resize, and we might as well redraw on other stuff
        // too
        Ok(())
    }
}
