use super::{OpenRequest, PrizeResolver, ResolveError};
use crate::config::MagicBoxConfig;
use crate::models::OpenBoxOutcome;
use rand::Rng;
use rand::seq::index;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_GRID_SIZE: usize = 100;
const MAX_DECORATIVE_PRIZES: usize = 3;

/// 装饰用网格，标记的格子只用于揭晓动画，与实际奖品无关
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    prize_cells: BTreeSet<usize>,
}

impl Grid {
    pub fn generate<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let size = size.max(1);
        let count = rng.gen_range(1..=MAX_DECORATIVE_PRIZES).min(size);
        let prize_cells = index::sample(rng, size, count).into_iter().collect();
        Self { size, prize_cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_prize_cell(&self, cell: usize) -> bool {
        self.prize_cells.contains(&cell)
    }

    pub fn prize_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.prize_cells.iter().copied()
    }
}

/// 结束后界面需要做的后续动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// 展示奖品详情
    ShowPrize,
    /// 抽中带训练计划的订阅，弹出排期日历
    ScheduleProgram { subscription_type_id: Option<i64> },
    /// 未中奖，进入安慰优惠流程
    OfferConsolation { box_id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameResult {
    Won {
        outcome: OpenBoxOutcome,
        follow_up: FollowUp,
    },
    Lost {
        outcome: OpenBoxOutcome,
        follow_up: FollowUp,
    },
    /// 出错按未中奖处理；仅暂时性错误保留原请求以便重试
    Failed {
        error: ResolveError,
        retry: Option<OpenRequest>,
    },
}

impl GameResult {
    fn from_resolution(request: OpenRequest, result: Result<OpenBoxOutcome, ResolveError>) -> Self {
        match result {
            Ok(outcome) if outcome.is_win() => {
                let follow_up = if outcome.includes_program == Some(true) {
                    FollowUp::ScheduleProgram {
                        subscription_type_id: outcome.subscription_type_id,
                    }
                } else {
                    FollowUp::ShowPrize
                };
                GameResult::Won { outcome, follow_up }
            }
            Ok(outcome) => GameResult::Lost {
                follow_up: FollowUp::OfferConsolation {
                    box_id: outcome.box_id,
                },
                outcome,
            },
            Err(error) => {
                let retry = error.is_transient().then_some(request);
                GameResult::Failed { error, retry }
            }
        }
    }

    pub fn is_win(&self) -> bool {
        matches!(self, GameResult::Won { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameState {
    Idle,
    InProgress {
        box_id: i64,
        grid: Grid,
    },
    Resolving {
        box_id: i64,
        grid: Grid,
        cell: usize,
        attempt_key: String,
    },
    Completed {
        box_id: i64,
        grid: Grid,
        cell: usize,
        result: GameResult,
    },
}

impl GameState {
    pub fn name(&self) -> &'static str {
        match self {
            GameState::Idle => "idle",
            GameState::InProgress { .. } => "in_progress",
            GameState::Resolving { .. } => "resolving",
            GameState::Completed { .. } => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Cell {cell} is outside the {size}-cell grid")]
    CellOutOfRange { cell: usize, size: usize },

    #[error("Magic box {0} was already played")]
    BoxAlreadyPlayed(i64),
}

/// 网格游戏状态机
///
/// Idle -> InProgress -> Resolving -> Completed -> (play_again) InProgress / (reset) Idle
///
/// 每个盒子只能选一次格子；选过格子的盒子不能再次开始。
pub struct GridGame<R> {
    rng: R,
    grid_size: usize,
    state: GameState,
    played: HashSet<i64>,
}

impl<R: Rng> GridGame<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            grid_size: DEFAULT_GRID_SIZE,
            state: GameState::Idle,
            played: HashSet::new(),
        }
    }

    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size.max(1);
        self
    }

    /// 网格大小取自 `[magic_box]` 配置
    pub fn from_config(rng: R, cfg: &MagicBoxConfig) -> Self {
        Self::new(rng).with_grid_size(cfg.grid_size)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn has_played(&self, box_id: i64) -> bool {
        self.played.contains(&box_id)
    }

    pub fn start(&mut self, box_id: i64) -> Result<&Grid, GameError> {
        self.ensure(matches!(self.state, GameState::Idle), "start")?;
        self.begin(box_id)
    }

    /// 选择格子，返回需要发送给开盒服务的请求
    pub fn select_cell(&mut self, cell: usize) -> Result<OpenRequest, GameError> {
        let GameState::InProgress { box_id, grid } = &self.state else {
            return Err(self.invalid("select a cell"));
        };
        if cell >= grid.size() {
            return Err(GameError::CellOutOfRange {
                cell,
                size: grid.size(),
            });
        }

        let box_id = *box_id;
        let grid = grid.clone();
        let attempt_key = Uuid::new_v4().to_string();
        self.played.insert(box_id);
        self.state = GameState::Resolving {
            box_id,
            grid,
            cell,
            attempt_key: attempt_key.clone(),
        };

        Ok(OpenRequest {
            box_id,
            idempotency_key: attempt_key,
        })
    }

    /// 应用开盒结果。任何结果（包括错误）都会进入 Completed
    pub fn complete(
        &mut self,
        result: Result<OpenBoxOutcome, ResolveError>,
    ) -> Result<&GameResult, GameError> {
        let (box_id, grid, cell, attempt_key) =
            match std::mem::replace(&mut self.state, GameState::Idle) {
                GameState::Resolving {
                    box_id,
                    grid,
                    cell,
                    attempt_key,
                } => (box_id, grid, cell, attempt_key),
                other => {
                    self.state = other;
                    return Err(self.invalid("complete"));
                }
            };

        let request = OpenRequest {
            box_id,
            idempotency_key: attempt_key,
        };
        if let Err(err) = &result {
            log::warn!("Opening box {box_id} failed: {err}");
        }
        self.state = GameState::Completed {
            box_id,
            grid,
            cell,
            result: GameResult::from_resolution(request, result),
        };

        match &self.state {
            GameState::Completed { result, .. } => Ok(result),
            _ => unreachable!("state set above"),
        }
    }

    /// 暂时性失败后重发同一请求（同一幂等键）
    pub fn retry_request(&mut self) -> Result<OpenRequest, GameError> {
        match std::mem::replace(&mut self.state, GameState::Idle) {
            GameState::Completed {
                grid,
                cell,
                result:
                    GameResult::Failed {
                        retry: Some(request),
                        ..
                    },
                ..
            } => {
                self.state = GameState::Resolving {
                    box_id: request.box_id,
                    grid,
                    cell,
                    attempt_key: request.idempotency_key.clone(),
                };
                Ok(request)
            }
            other => {
                self.state = other;
                Err(self.invalid("retry"))
            }
        }
    }

    /// 换一个从未玩过的盒子重新开始
    pub fn play_again(&mut self, new_box_id: i64) -> Result<&Grid, GameError> {
        self.ensure(
            matches!(self.state, GameState::Completed { .. }),
            "play again",
        )?;
        self.begin(new_box_id)
    }

    /// 回到 Idle；请求进行中时不允许（开盒请求不可取消）
    pub fn reset(&mut self) -> Result<(), GameError> {
        self.ensure(
            !matches!(self.state, GameState::Resolving { .. }),
            "reset",
        )?;
        self.state = GameState::Idle;
        Ok(())
    }

    /// select_cell -> resolver -> complete
    pub async fn play<P: PrizeResolver>(
        &mut self,
        cell: usize,
        resolver: &P,
    ) -> Result<&GameResult, GameError> {
        let request = self.select_cell(cell)?;
        let result = resolver.resolve(&request).await;
        self.complete(result)
    }

    fn begin(&mut self, box_id: i64) -> Result<&Grid, GameError> {
        if self.played.contains(&box_id) {
            return Err(GameError::BoxAlreadyPlayed(box_id));
        }
        let grid = Grid::generate(self.grid_size, &mut self.rng);
        self.state = GameState::InProgress { box_id, grid };
        match &self.state {
            GameState::InProgress { grid, .. } => Ok(grid),
            _ => unreachable!("state set above"),
        }
    }

    fn ensure(&self, ok: bool, action: &'static str) -> Result<(), GameError> {
        if ok { Ok(()) } else { Err(self.invalid(action)) }
    }

    fn invalid(&self, action: &'static str) -> GameError {
        GameError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }
}
