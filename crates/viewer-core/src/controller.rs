//! Headless controller: turns discrete UI commands into page view calls and
//! keeps toolbar state in step with the view.

use crate::events::PageChanged;
use crate::view::{PageView, RenderOutcome};
use crate::{PagePicker, SavedView, ViewError, ViewResult, ViewerConfig, Zoom};
use leafview_engine::{OpenSource, RenderBackend, RgbaImage};
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolbarState {
    pub prev_enabled: bool,
    pub next_enabled: bool,
    /// `current/total`
    pub label: String,
}

impl ToolbarState {
    fn update(&mut self, event: &PageChanged) {
        self.prev_enabled = event.page != 1;
        self.next_enabled = event.page != event.page_count;
        self.label = format!("{}/{}", event.page, event.page_count);
    }
}

/// Entries of the zoom selector, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomPreset {
    FitWidth,
    Quarter,
    Half,
    ThreeQuarters,
    Actual,
    OneAndAQuarter,
}

impl ZoomPreset {
    pub const ALL: [ZoomPreset; 6] = [
        ZoomPreset::FitWidth,
        ZoomPreset::Quarter,
        ZoomPreset::Half,
        ZoomPreset::ThreeQuarters,
        ZoomPreset::Actual,
        ZoomPreset::OneAndAQuarter,
    ];

    /// Unknown positions select fit-width.
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(Self::FitWidth)
    }

    pub fn zoom(self) -> Zoom {
        match self {
            Self::FitWidth => Zoom::FitWidth,
            Self::Quarter => Zoom::Scale(0.25),
            Self::Half => Zoom::Scale(0.5),
            Self::ThreeQuarters => Zoom::Scale(0.75),
            Self::Actual => Zoom::Scale(1.0),
            Self::OneAndAQuarter => Zoom::Scale(1.25),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FitWidth => "Fit width",
            Self::Quarter => "25%",
            Self::Half => "50%",
            Self::ThreeQuarters => "75%",
            Self::Actual => "100%",
            Self::OneAndAQuarter => "125%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Next,
    Prev,
    Goto(u32),
    Zoom(Zoom),
    Scroll { dx: i64, dy: i64 },
    /// Open the page picker at the current page, move it to the value and accept.
    Pick(i64),
}

impl FromStr for Command {
    type Err = ViewError;

    /// Parses `next`, `prev`, `goto N`, `zoom fit|F`, `preset I`,
    /// `scroll DX DY` and `pick N`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let unknown = || ViewError::UnknownCommand(input.trim().to_owned());
        let mut words = input.split_whitespace();
        let verb = words.next().ok_or_else(unknown)?;
        let args: Vec<&str> = words.collect();

        let command = match (verb, args.as_slice()) {
            ("next", []) => Self::Next,
            ("prev", []) => Self::Prev,
            ("goto", [page]) => Self::Goto(page.parse().map_err(|_| unknown())?),
            ("zoom", ["fit"]) => Self::Zoom(Zoom::FitWidth),
            ("zoom", [factor]) => {
                Self::Zoom(Zoom::from_legacy(factor.parse().map_err(|_| unknown())?))
            }
            ("preset", [index]) => {
                Self::Zoom(ZoomPreset::from_index(index.parse().map_err(|_| unknown())?).zoom())
            }
            ("scroll", [dx, dy]) => Self::Scroll {
                dx: dx.parse().map_err(|_| unknown())?,
                dy: dy.parse().map_err(|_| unknown())?,
            },
            ("pick", [page]) => Self::Pick(page.parse().map_err(|_| unknown())?),
            _ => return Err(unknown()),
        };

        Ok(command)
    }
}

/// Splits a script on `;` and newlines, skipping blanks.
pub fn parse_script(script: &str) -> ViewResult<Vec<Command>> {
    script
        .split(|c: char| c == ';' || c == '\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::parse::<Command>)
        .collect()
}

pub struct ViewerController<B: RenderBackend> {
    view: PageView<B>,
    picker: PagePicker,
    toolbar: Rc<RefCell<ToolbarState>>,
}

impl<B: RenderBackend> ViewerController<B> {
    pub fn new(backend: B, config: &ViewerConfig) -> Self {
        let mut view = PageView::new(backend, config);
        let toolbar = Rc::new(RefCell::new(ToolbarState::default()));

        let state = Rc::clone(&toolbar);
        view.events_mut().page_changed.subscribe(move |event| state.borrow_mut().update(event));

        Self { view, picker: PagePicker::new(), toolbar }
    }

    pub fn view(&self) -> &PageView<B> {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut PageView<B> {
        &mut self.view
    }

    pub fn picker(&self) -> &PagePicker {
        &self.picker
    }

    pub fn picker_mut(&mut self) -> &mut PagePicker {
        &mut self.picker
    }

    pub fn toolbar(&self) -> ToolbarState {
        self.toolbar.borrow().clone()
    }

    pub fn open(&mut self, source: OpenSource) -> ViewResult<()> {
        self.view.open(source)?;
        self.picker.set_max(i64::from(self.view.page_count()))
    }

    /// Applies one command; returns whether view state changed.
    pub fn apply(&mut self, command: Command) -> ViewResult<bool> {
        let changed = match command {
            Command::Next => self.view.next_page(),
            Command::Prev => self.view.prev_page(),
            Command::Goto(page) => self.view.goto_page(page),
            Command::Zoom(zoom) => self.view.set_zoom(zoom),
            Command::Scroll { dx, dy } => self.view.scroll_by(dx, dy),
            Command::Pick(page) => {
                self.picker.set_current(i64::from(self.view.current_page()))?;
                self.picker.set_current(page)?;
                let page = self.picker.accept();
                self.view.goto_page(page)
            }
        };

        Ok(changed)
    }

    pub fn select_zoom_preset(&mut self, index: usize) -> bool {
        self.view.set_zoom(ZoomPreset::from_index(index).zoom())
    }

    pub fn render(&mut self, frame: &mut RgbaImage) -> ViewResult<RenderOutcome> {
        self.view.render(frame)
    }

    pub fn suspend(&self) -> SavedView {
        SavedView { page: self.view.current_page(), zoom: self.view.zoom().to_legacy() }
    }

    /// Restores zoom first, then the page.
    pub fn resume(&mut self, saved: &SavedView) {
        self.view.set_zoom(Zoom::from_legacy(saved.zoom));
        self.view.goto_page(saved.page);
    }
}
